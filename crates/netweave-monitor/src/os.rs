// ── OS collaborator contracts ──
//
// Everything the loops know about the host goes through these traits.
// Implementations own process spawning, sysfs and serial I/O; the loops
// only call them and treat every failure as retryable on the next tick.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use serde::Serialize;

use netweave_core::{InterfaceKind, ModemConfig, PppState, UsbDevice, WifiMode};

use crate::error::OsError;
use crate::registry::SupportedModem;

pub type OsResult<T> = Result<T, OsError>;

// ── Data exchanged with collaborators ────────────────────────────────

/// One kernel routing-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub destination: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub interface: String,
}

impl Route {
    pub fn default_via(gateway: Ipv4Addr, interface: impl Into<String>) -> Self {
        Self {
            destination: Ipv4Addr::UNSPECIFIED,
            gateway,
            netmask: Ipv4Addr::UNSPECIFIED,
            interface: interface.into(),
        }
    }

    /// Default route with a real gateway.
    pub fn is_default(&self) -> bool {
        self.destination.is_unspecified() && !self.gateway.is_unspecified()
    }
}

/// Result of a WiFi scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessPoint {
    pub ssid: String,
    pub strength: i32,
}

/// Effective DNS forwarder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForwarderConfig {
    pub forwarders: BTreeSet<IpAddr>,
    pub allowed_networks: BTreeSet<Ipv4Net>,
}

impl ForwarderConfig {
    /// The forwarder only runs when some LAN is allowed to use it.
    pub fn is_enabled(&self) -> bool {
        !self.allowed_networks.is_empty()
    }
}

/// A USB cellular modem as discovered on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModemDevice {
    /// Configuration name of the modem interface (`1-1.4`).
    pub interface_name: String,
    pub usb: UsbDevice,
}

impl ModemDevice {
    pub fn usb_port(&self) -> String {
        self.usb.usb_port()
    }
}

// ── Contracts ────────────────────────────────────────────────────────

#[async_trait]
pub trait NetworkAdmin: Send + Sync {
    async fn is_up(&self, name: &str) -> OsResult<bool>;
    async fn has_address(&self, name: &str) -> OsResult<bool>;
    async fn current_address(&self, name: &str) -> OsResult<Option<IpAddr>>;
    async fn is_link_up(&self, kind: InterfaceKind, name: &str) -> OsResult<bool>;
    async fn carrier_changes(&self, name: &str) -> OsResult<u64>;
    async fn enable_interface(&self, name: &str, dhcp: bool) -> OsResult<()>;
    async fn disable_interface(&self, name: &str) -> OsResult<()>;
    async fn manage_dhcp_server(&self, name: &str, enabled: bool) -> OsResult<()>;
    async fn is_dhcp_server_running(&self, name: &str) -> OsResult<bool>;
    async fn renew_dhcp_lease(&self, name: &str) -> OsResult<()>;
}

#[async_trait]
pub trait RouteTable: Send + Sync {
    async fn default_route(&self, name: &str) -> OsResult<Option<Route>>;
    async fn routes(&self) -> OsResult<Vec<Route>>;
    async fn remove_route(&self, route: &Route) -> OsResult<()>;
}

#[async_trait]
pub trait WifiDriver: Send + Sync {
    async fn load_kernel_module(&self, name: &str, mode: WifiMode) -> OsResult<()>;
    async fn unload_kernel_module(&self, name: &str) -> OsResult<()>;
    async fn scan(&self, name: &str) -> OsResult<Vec<AccessPoint>>;
    async fn is_access_point_process_running(&self, name: &str) -> OsResult<bool>;
    async fn is_station_process_running(&self, name: &str) -> OsResult<bool>;
    async fn kernel_mode(&self, name: &str) -> OsResult<WifiMode>;
    /// Ping the gateway of the interface's default route.
    async fn is_access_point_reachable(&self, name: &str, timeout: Duration) -> OsResult<bool>;
    async fn signal_level(&self, name: &str, ssid: &str) -> OsResult<i32>;
    async fn is_device_powered(&self) -> OsResult<bool>;
    async fn set_device_power(&self, on: bool) -> OsResult<()>;
}

#[async_trait]
pub trait CellularModem: Send + Sync {
    async fn model(&self) -> OsResult<String>;
    /// IMEI.
    async fn serial_number(&self) -> OsResult<String>;
    async fn imsi(&self) -> OsResult<String>;
    async fn iccid(&self) -> OsResult<String>;
    async fn ppp_state(&self) -> OsResult<PppState>;
    async fn connect(&self, config: &ModemConfig) -> OsResult<()>;
    async fn disconnect(&self) -> OsResult<()>;
    async fn reset(&self) -> OsResult<()>;
    async fn is_sim_card_ready(&self) -> OsResult<bool>;
    async fn is_gps_enabled(&self) -> OsResult<bool>;
    async fn enable_gps(&self) -> OsResult<()>;
    async fn disable_gps(&self) -> OsResult<()>;
    async fn set_diversity(&self, enabled: bool) -> OsResult<()>;
    async fn is_provisioned(&self) -> OsResult<bool>;
    async fn provision(&self) -> OsResult<()>;
    async fn signal_strength(&self) -> OsResult<i32>;
}

/// Builds the driver for a modem resolved from the registry.
#[async_trait]
pub trait ModemDriverFactory: Send + Sync {
    async fn create(
        &self,
        model: &SupportedModem,
        device: &ModemDevice,
    ) -> OsResult<Arc<dyn CellularModem>>;
}

#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn servers(&self) -> OsResult<BTreeSet<IpAddr>>;
    async fn set_servers(&self, servers: &BTreeSet<IpAddr>) -> OsResult<()>;
    /// Servers learned by the DHCP client on `name`.
    async fn dhcp_servers(&self, name: &str) -> OsResult<Vec<IpAddr>>;
    /// Servers negotiated by the PPP daemon.
    async fn ppp_servers(&self) -> OsResult<Vec<IpAddr>>;
}

#[async_trait]
pub trait DnsForwarder: Send + Sync {
    async fn config(&self) -> OsResult<ForwarderConfig>;
    async fn set_config(&self, config: &ForwarderConfig) -> OsResult<()>;
    async fn enable(&self) -> OsResult<()>;
    async fn disable(&self) -> OsResult<()>;
}
