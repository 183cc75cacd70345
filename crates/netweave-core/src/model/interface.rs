// ── Interface domain types ──

use std::net::IpAddr;

use serde::Serialize;
use strum::{Display, EnumString};

use super::dhcp::DhcpServerConfig4;
use super::ip::{NetConfigIp4, NetConfigIp6, NetInterfaceStatus};
use super::modem::{ModemConfig, ModemConnectionStatus};
use super::net_config::NetConfig;
use super::wifi::{WifiConfig, WifiMode};

/// Interface class discriminant (`net.interface.<name>.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum InterfaceKind {
    Ethernet,
    Wifi,
    Modem,
    Loopback,
    Vlan,
    Unknown,
}

impl InterfaceKind {
    /// Classes a configuration may legitimately contain.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Self::Ethernet | Self::Wifi | Self::Modem | Self::Loopback
        )
    }
}

/// USB identity of the device backing an interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UsbDevice {
    pub vendor_id: String,
    pub vendor_name: String,
    pub product_id: String,
    pub product_name: String,
    pub bus_number: String,
    pub device_path: String,
}

impl UsbDevice {
    /// Port string (`<bus>-<path>`) used to key tracked modems.
    pub fn usb_port(&self) -> String {
        format!("{}-{}", self.bus_number, self.device_path)
    }
}

/// Read-only modem identity reported with a cellular interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModemIdentity {
    pub manufacturer: String,
    pub model: String,
    pub revision_id: Vec<String>,
    pub serial_number: String,
    pub technology_types: Vec<String>,
    pub identifier: String,
    pub power_mode: String,
    pub powered_on: bool,
}

// ── InterfaceAddressConfig ───────────────────────────────────────────

/// Observed address data plus the protocol fragments configured on it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InterfaceAddressConfig {
    pub address: Option<IpAddr>,
    pub prefix: u8,
    pub netmask: Option<IpAddr>,
    pub gateway: Option<IpAddr>,
    pub broadcast: Option<IpAddr>,
    pub dns_servers: Vec<IpAddr>,
    /// WiFi: active mode selecting which fragment applies.
    pub wifi_mode: WifiMode,
    /// WiFi: bit rate in bit/s.
    pub bitrate: u64,
    /// WiFi: SSID of the associated access point.
    pub access_point: Option<String>,
    pub connection_status: Option<ModemConnectionStatus>,
    pub configs: Vec<NetConfig>,
}

impl InterfaceAddressConfig {
    pub fn with_configs(configs: Vec<NetConfig>) -> Self {
        Self {
            configs,
            ..Self::default()
        }
    }
}

// ── InterfaceConfig ──────────────────────────────────────────────────

/// Desired configuration plus descriptive facts for one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub kind: InterfaceKind,
    pub hardware_address: Option<String>,
    pub mtu: i32,
    pub driver: String,
    pub driver_version: String,
    pub firmware_version: String,
    pub loopback: bool,
    pub point_to_point: bool,
    pub is_virtual: bool,
    pub multicast: bool,
    pub up: bool,
    pub autoconnect: bool,
    pub state: Option<String>,
    /// Ethernet carrier as last reported (`eth.link.up`).
    pub link_up: Option<bool>,
    pub usb: Option<UsbDevice>,
    pub modem: Option<ModemIdentity>,
    pub addresses: Vec<InterfaceAddressConfig>,
}

impl InterfaceConfig {
    pub fn new(name: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            hardware_address: None,
            mtu: 0,
            driver: String::new(),
            driver_version: String::new(),
            firmware_version: String::new(),
            loopback: kind == InterfaceKind::Loopback,
            point_to_point: kind == InterfaceKind::Modem,
            is_virtual: false,
            multicast: false,
            up: false,
            autoconnect: false,
            state: None,
            link_up: None,
            usb: None,
            modem: None,
            addresses: Vec::new(),
        }
    }

    /// Builder helper: one address carrying `configs`.
    pub fn with_configs(mut self, configs: Vec<NetConfig>) -> Self {
        self.addresses = vec![InterfaceAddressConfig::with_configs(configs)];
        self
    }

    pub fn with_wifi_mode(mut self, mode: WifiMode) -> Self {
        if self.addresses.is_empty() {
            self.addresses.push(InterfaceAddressConfig::default());
        }
        for addr in &mut self.addresses {
            addr.wifi_mode = mode;
        }
        self
    }

    /// Every fragment across all addresses.
    pub fn configs(&self) -> impl Iterator<Item = &NetConfig> {
        self.addresses.iter().flat_map(|a| a.configs.iter())
    }

    pub fn ip4(&self) -> Option<&NetConfigIp4> {
        self.configs().find_map(|c| match c {
            NetConfig::Ip4(ip) => Some(ip),
            _ => None,
        })
    }

    pub fn ip6(&self) -> Option<&NetConfigIp6> {
        self.configs().find_map(|c| match c {
            NetConfig::Ip6(ip) => Some(ip),
            _ => None,
        })
    }

    pub fn dhcp_server4(&self) -> Option<&DhcpServerConfig4> {
        self.configs().find_map(|c| match c {
            NetConfig::DhcpServer4(d) => Some(d),
            _ => None,
        })
    }

    pub fn modem_config(&self) -> Option<&ModemConfig> {
        self.configs().find_map(|c| match c {
            NetConfig::Modem(m) => Some(m),
            _ => None,
        })
    }

    pub fn wifi_config(&self, mode: WifiMode) -> Option<&WifiConfig> {
        self.configs().find_map(|c| match c {
            NetConfig::Wifi(w) if w.mode == mode => Some(w),
            _ => None,
        })
    }

    /// Active WiFi mode, `Unknown` for non-WiFi interfaces.
    pub fn wifi_mode(&self) -> WifiMode {
        self.addresses
            .first()
            .map_or(WifiMode::Unknown, |a| a.wifi_mode)
    }

    /// The WiFi fragment for the active mode.
    pub fn active_wifi_config(&self) -> Option<&WifiConfig> {
        self.wifi_config(self.wifi_mode())
    }

    /// IPv4 status, `Unknown` when no IPv4 fragment is present.
    pub fn status(&self) -> NetInterfaceStatus {
        self.ip4().map_or(NetInterfaceStatus::Unknown, |ip| ip.status)
    }

    pub fn is_dhcp_client(&self) -> bool {
        self.ip4().is_some_and(|ip| ip.dhcp)
    }

    /// LAN or WAN.
    pub fn is_enabled(&self) -> bool {
        self.status().is_enabled()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mtu < 0 {
            return Err(format!("{}: negative MTU {}", self.name, self.mtu));
        }
        if !self.kind.is_supported() {
            return Err(format!("{}: unsupported interface type {}", self.name, self.kind));
        }
        if let Some(bad) = self.configs().find(|c| !c.is_valid()) {
            return Err(format!("{}: invalid {} configuration", self.name, bad.kind()));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
