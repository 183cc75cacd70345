// ── Network-level interpreter ──
//
// Walks `net.interfaces`, reads the descriptive keys of each interface and
// delegates protocol fragments to the per-family interpreters.

use std::net::{IpAddr, Ipv4Addr};

use super::{ip, modem, wifi};
use crate::error::{NetError, Result};
use crate::model::{
    InterfaceAddressConfig, InterfaceConfig, InterfaceKind, ModemIdentity, NetworkConfiguration,
    UsbDevice, WifiMode,
};
use crate::properties::{
    config_key, interface_key, join_addresses, Properties, INTERFACES_KEY,
    MODIFIED_INTERFACES_KEY,
};

/// An interface that could not be interpreted and stays unconfigured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedInterface {
    pub name: String,
    pub error: NetError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNetwork {
    pub configuration: NetworkConfiguration,
    pub rejected: Vec<RejectedInterface>,
}

pub fn parse(props: &Properties) -> ParsedNetwork {
    let mut parsed = ParsedNetwork::default();

    for name in props.list(INTERFACES_KEY) {
        match parse_interface(props, &name) {
            Ok(Some(iface)) => parsed.configuration.add_interface(iface),
            Ok(None) => {}
            Err(error) => parsed.rejected.push(RejectedInterface { name, error }),
        }
    }

    let modified = props.list(MODIFIED_INTERFACES_KEY);
    if !modified.is_empty() {
        parsed.configuration.set_modified_interface_names(modified);
    }
    parsed
}

/// One interface. `Ok(None)` when the type is missing or unknown.
pub fn parse_interface(props: &Properties, name: &str) -> Result<Option<InterfaceConfig>> {
    let ro = |suffix: &str| interface_key(name, suffix);
    let cfg = |suffix: &str| config_key(name, suffix);

    let Some(type_token) = props.text(&ro("type")) else {
        tracing::warn!(interface = name, "no interface type, skipping");
        return Ok(None);
    };
    let kind = match type_token.parse::<InterfaceKind>() {
        Ok(InterfaceKind::Unknown) | Err(_) => {
            tracing::warn!(interface = name, kind = %type_token, "unsupported interface type, skipping");
            return Ok(None);
        }
        Ok(kind) => kind,
    };

    let mut iface = InterfaceConfig::new(name, kind);
    iface.hardware_address = props.text(&ro("mac"));
    iface.mtu = props.int_or(&cfg("mtu"), 0)?;
    iface.driver = props.text(&ro("driver")).unwrap_or_default();
    iface.driver_version = props.text(&ro("driver.version")).unwrap_or_default();
    iface.firmware_version = props.text(&ro("firmware.version")).unwrap_or_default();
    iface.loopback = props.bool_or(&ro("loopback"), iface.loopback)?;
    iface.point_to_point = props.bool_or(&ro("ptp"), iface.point_to_point)?;
    iface.up = props.bool_or(&ro("up"), false)?;
    iface.is_virtual = props.bool_or(&ro("virtual"), false)?;
    iface.multicast = props.bool_or(&ro("multicast"), false)?;
    iface.autoconnect = props.bool_or(&cfg("autoconnect"), false)?;
    iface.state = props.text(&cfg("state"));
    iface.link_up = props.bool(&ro("eth.link.up"))?;
    iface.usb = parse_usb(props, name);
    if kind == InterfaceKind::Modem {
        iface.modem = parse_modem_identity(props, name)?;
    }

    let mut address = parse_observed_address(props, name, kind)?;
    let ctx = ip::IpContext {
        observed_address: match address.address {
            Some(IpAddr::V4(a)) => Some(a),
            _ => None,
        },
        is_virtual: iface.is_virtual,
    };
    match kind {
        InterfaceKind::Wifi => address.configs.extend(wifi::parse(props, name)?),
        InterfaceKind::Modem => address.configs.extend(modem::parse(props, name)?),
        _ => {}
    }
    address.configs.extend(ip::parse(props, name, ctx)?);
    iface.addresses = vec![address];

    Ok(Some(iface))
}

fn parse_usb(props: &Properties, name: &str) -> Option<UsbDevice> {
    let ro = |suffix: &str| props.text(&interface_key(name, suffix));
    let (vendor_id, product_id) = (ro("usb.vendor.id")?, ro("usb.product.id")?);
    Some(UsbDevice {
        vendor_id,
        vendor_name: ro("usb.vendor.name").unwrap_or_default(),
        product_id,
        product_name: ro("usb.product.name").unwrap_or_default(),
        bus_number: ro("usb.busNumber").unwrap_or_default(),
        device_path: ro("usb.devicePath").unwrap_or_default(),
    })
}

const MODEM_IDENTITY_KEYS: [&str; 5] = [
    "manufacturer",
    "model",
    "revisionId",
    "serialNum",
    "technologyTypes",
];

fn parse_modem_identity(props: &Properties, name: &str) -> Result<Option<ModemIdentity>> {
    let ro = |suffix: &str| interface_key(name, suffix);
    let cfg = |suffix: &str| config_key(name, suffix);

    let present = MODEM_IDENTITY_KEYS.iter().any(|k| props.contains_key(&ro(k)))
        || props.contains_key(&cfg("identifier"));
    if !present {
        return Ok(None);
    }
    Ok(Some(ModemIdentity {
        manufacturer: props.text(&ro("manufacturer")).unwrap_or_default(),
        model: props.text(&ro("model")).unwrap_or_default(),
        revision_id: props.list(&ro("revisionId")),
        serial_number: props.text(&ro("serialNum")).unwrap_or_default(),
        technology_types: props.list(&ro("technologyTypes")),
        identifier: props.text(&cfg("identifier")).unwrap_or_default(),
        power_mode: props.text(&cfg("powerMode")).unwrap_or_default(),
        powered_on: props.bool_or(&ro("poweredOn"), false)?,
    }))
}

fn parse_observed_address(
    props: &Properties,
    name: &str,
    kind: InterfaceKind,
) -> Result<InterfaceAddressConfig> {
    let ro = |suffix: &str| interface_key(name, suffix);

    let mut address = InterfaceAddressConfig {
        address: props.address(&ro("ip4.address"))?,
        prefix: props.int_or(&ro("ip4.prefix"), 0)?,
        netmask: props.address(&ro("ip4.netmask"))?,
        gateway: props.address(&ro("ip4.gateway"))?,
        broadcast: props.address(&ro("ip4.broadcast"))?,
        dns_servers: props.addresses(&ro("ip4.dnsServers"))?,
        ..InterfaceAddressConfig::default()
    };

    match kind {
        InterfaceKind::Wifi => {
            address.wifi_mode = wifi::parse_mode(props, name)?;
            address.bitrate = props.int_or(&ro("wifi.bitrate"), 0)?;
            address.access_point = props.text(&ro("wifi.ssid"));
        }
        InterfaceKind::Modem => {
            address.connection_status = props.parse(&config_key(name, "connection.status"))?;
        }
        _ => {}
    }
    Ok(address)
}

// ── Serialization ────────────────────────────────────────────────────

pub fn serialize(config: &NetworkConfiguration) -> Properties {
    let mut props = Properties::new();

    props.insert(
        INTERFACES_KEY,
        config.interface_names().collect::<Vec<_>>().join(","),
    );
    let modified: Vec<&str> = config.modified_interface_names().collect();
    if !modified.is_empty() {
        props.insert(MODIFIED_INTERFACES_KEY, modified.join(","));
    }

    for iface in config.interfaces() {
        serialize_interface(iface, &mut props);
    }
    props
}

pub fn serialize_interface(iface: &InterfaceConfig, props: &mut Properties) {
    let name = iface.name.as_str();
    let ro = |suffix: &str| interface_key(name, suffix);
    let cfg = |suffix: &str| config_key(name, suffix);

    props.insert(ro("type"), iface.kind.to_string());
    props.insert(cfg("name"), name);
    props.insert(cfg("autoconnect"), iface.autoconnect);
    props.insert(cfg("mtu"), iface.mtu);
    props.insert(ro("driver"), iface.driver.as_str());
    props.insert(ro("driver.version"), iface.driver_version.as_str());
    props.insert(ro("firmware.version"), iface.firmware_version.as_str());
    if let Some(mac) = &iface.hardware_address {
        props.insert(ro("mac"), mac.as_str());
    }
    props.insert(ro("loopback"), iface.loopback);
    props.insert(ro("ptp"), iface.point_to_point);
    props.insert(ro("up"), iface.up);
    props.insert(ro("virtual"), iface.is_virtual);
    props.insert(ro("multicast"), iface.multicast);
    if let Some(state) = &iface.state {
        props.insert(cfg("state"), state.as_str());
    }
    if let Some(link_up) = iface.link_up {
        props.insert(ro("eth.link.up"), link_up);
    }

    if let Some(usb) = &iface.usb {
        props.insert(ro("usb.vendor.id"), usb.vendor_id.as_str());
        props.insert(ro("usb.vendor.name"), usb.vendor_name.as_str());
        props.insert(ro("usb.product.id"), usb.product_id.as_str());
        props.insert(ro("usb.product.name"), usb.product_name.as_str());
        props.insert(ro("usb.busNumber"), usb.bus_number.as_str());
        props.insert(ro("usb.devicePath"), usb.device_path.as_str());
    }

    if let Some(modem) = &iface.modem {
        props.insert(ro("manufacturer"), modem.manufacturer.as_str());
        props.insert(ro("model"), modem.model.as_str());
        props.insert(ro("revisionId"), modem.revision_id.join(","));
        props.insert(ro("serialNum"), modem.serial_number.as_str());
        props.insert(ro("technologyTypes"), modem.technology_types.join(","));
        props.insert(cfg("identifier"), modem.identifier.as_str());
        props.insert(cfg("powerMode"), modem.power_mode.as_str());
        props.insert(ro("poweredOn"), modem.powered_on);
    }

    for address in &iface.addresses {
        serialize_observed_address(iface, address, props);
        match iface.kind {
            InterfaceKind::Wifi => wifi::serialize(&address.configs, name, props),
            InterfaceKind::Modem => modem::serialize(&address.configs, name, props),
            _ => {}
        }
        ip::serialize(&address.configs, name, props);
    }
}

fn serialize_observed_address(
    iface: &InterfaceConfig,
    address: &InterfaceAddressConfig,
    props: &mut Properties,
) {
    let name = iface.name.as_str();
    let ro = |suffix: &str| interface_key(name, suffix);

    if let Some(a) = address.address {
        props.insert(ro("ip4.address"), a.to_string());
    }
    props.insert(ro("ip4.prefix"), address.prefix);
    if let Some(m) = address.netmask {
        props.insert(ro("ip4.netmask"), m.to_string());
    }
    if let Some(g) = address.gateway {
        props.insert(ro("ip4.gateway"), g.to_string());
    }
    if let Some(b) = address.broadcast {
        props.insert(ro("ip4.broadcast"), b.to_string());
    }
    if !address.dns_servers.is_empty() {
        props.insert(ro("ip4.dnsServers"), join_addresses(&address.dns_servers));
    }

    match iface.kind {
        InterfaceKind::Wifi => {
            let mode = if address.wifi_mode == WifiMode::Unknown {
                WifiMode::Infra
            } else {
                address.wifi_mode
            };
            props.insert(wifi::mode_key(name), mode.to_string());
            props.insert(ro("wifi.bitrate"), address.bitrate);
            if let Some(ap) = &address.access_point {
                props.insert(ro("wifi.ssid"), ap.as_str());
            }
        }
        InterfaceKind::Modem => {
            if let Some(status) = address.connection_status {
                props.insert(config_key(name, "connection.status"), status.to_string());
            }
        }
        _ => {}
    }
}

/// IPv4 address the OS reported for an interface, if any.
pub fn observed_ipv4(iface: &InterfaceConfig) -> Option<Ipv4Addr> {
    iface.addresses.iter().find_map(|a| match a.address {
        Some(IpAddr::V4(v4)) => Some(v4),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::NetInterfaceStatus;
    use pretty_assertions::assert_eq;

    fn gateway_props() -> Properties {
        let mut p = Properties::new();
        p.insert("net.interfaces", "eth0,wlan0,1-1.2,lo,can0");
        p.insert("modified.interface.names", "eth0");

        p.insert("net.interface.eth0.type", "ETHERNET");
        p.insert("net.interface.eth0.mac", "00:11:22:33:44:55");
        p.insert("net.interface.eth0.config.mtu", 1500_i64);
        p.insert("net.interface.eth0.eth.link.up", true);
        p.insert("net.interface.eth0.config.ip4.status", "netIPv4StatusEnabledWAN");
        p.insert("net.interface.eth0.config.dhcpClient4.enabled", true);

        p.insert("net.interface.wlan0.type", "WIFI");
        p.insert("net.interface.wlan0.config.wifi.mode", "MASTER");
        p.insert("net.interface.wlan0.config.wifi.master.ssid", "gw");
        p.insert("net.interface.wlan0.config.ip4.status", "netIPv4StatusEnabledLAN");

        p.insert("net.interface.1-1.2.type", "MODEM");
        p.insert("net.interface.1-1.2.usb.vendor.id", "1bc7");
        p.insert("net.interface.1-1.2.usb.product.id", "1201");
        p.insert("net.interface.1-1.2.model", "LE910");
        p.insert("net.interface.1-1.2.config.apn", "internet");

        p.insert("net.interface.lo.type", "LOOPBACK");
        p.insert("net.interface.can0.type", "CAN");
        p
    }

    #[test]
    fn unknown_types_are_skipped_and_order_is_kept() {
        let parsed = parse(&gateway_props());
        assert!(parsed.rejected.is_empty());
        let names: Vec<_> = parsed.configuration.interface_names().collect();
        assert_eq!(names, vec!["eth0", "wlan0", "1-1.2", "lo"]);
    }

    #[test]
    fn descriptive_and_protocol_fields_are_populated() {
        let cfg = parse(&gateway_props()).configuration;

        let eth0 = cfg.interface("eth0").unwrap();
        assert_eq!(eth0.mtu, 1500);
        assert_eq!(eth0.link_up, Some(true));
        assert_eq!(eth0.status(), NetInterfaceStatus::EnabledWan);
        assert!(eth0.is_dhcp_client());

        let wlan0 = cfg.interface("wlan0").unwrap();
        assert_eq!(wlan0.wifi_mode(), WifiMode::Master);
        assert_eq!(wlan0.active_wifi_config().unwrap().ssid, "gw");

        let modem = cfg.interface("1-1.2").unwrap();
        assert_eq!(modem.usb.as_ref().unwrap().vendor_id, "1bc7");
        assert_eq!(modem.modem.as_ref().unwrap().model, "LE910");
        assert_eq!(modem.modem_config().unwrap().apn, "internet");

        let names: Vec<_> = cfg.modified_interface_names().collect();
        assert_eq!(names, vec!["eth0"]);
    }

    #[test]
    fn failing_interface_is_rejected_alone() {
        let mut p = gateway_props();
        p.insert("net.interface.wlan0.config.wifi.master.securityType", "BOGUS");
        let parsed = parse(&p);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].name, "wlan0");
        assert!(parsed.configuration.interface("wlan0").is_none());
        assert!(parsed.configuration.interface("eth0").is_some());
    }

    #[test]
    fn serialize_then_parse_is_identity() {
        let cfg = parse(&gateway_props()).configuration;
        let again = parse(&serialize(&cfg)).configuration;
        assert_eq!(again, cfg);
    }
}
