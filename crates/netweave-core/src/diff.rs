// ── Config-diff engine ──
//
// Decides whether an interface must be torn down and brought back up for a
// new configuration. The comparison is deliberately loose: fragments that
// have no observable effect (auto-NAT, disabled DHCP servers, WiFi modes
// that are not active) never trigger a reconfiguration.

use std::fmt;

use crate::model::{
    InterfaceAddressConfig, InterfaceConfig, InterfaceKind, NetConfig, NetConfigKind,
    NetworkConfiguration, WifiMode,
};

/// First difference found between two interface configurations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconfigurationReason {
    Added,
    Removed,
    AddressCount { old: usize, new: usize },
    WifiModeChanged { old: WifiMode, new: WifiMode },
    FragmentCount { old: usize, new: usize },
    FragmentMissing(NetConfigKind),
    FragmentChanged(NetConfigKind),
}

impl fmt::Display for ReconfigurationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("interface added"),
            Self::Removed => f.write_str("interface removed"),
            Self::AddressCount { old, new } => write!(f, "address count {old} -> {new}"),
            Self::WifiModeChanged { old, new } => write!(f, "wifi mode {old} -> {new}"),
            Self::FragmentCount { old, new } => write!(f, "fragment count {old} -> {new}"),
            Self::FragmentMissing(kind) => write!(f, "{kind} fragment missing"),
            Self::FragmentChanged(kind) => write!(f, "{kind} fragment changed"),
        }
    }
}

pub fn needs_reconfiguration(old: Option<&InterfaceConfig>, new: Option<&InterfaceConfig>) -> bool {
    reconfiguration_reason(old, new).is_some()
}

/// `None` when `new` can be adopted without touching the interface.
pub fn reconfiguration_reason(
    old: Option<&InterfaceConfig>,
    new: Option<&InterfaceConfig>,
) -> Option<ReconfigurationReason> {
    let (old, new) = match (old, new) {
        (None, None) => return None,
        (None, Some(_)) => return Some(ReconfigurationReason::Added),
        (Some(_), None) => return Some(ReconfigurationReason::Removed),
        (Some(old), Some(new)) => (old, new),
    };

    if old.addresses.len() != new.addresses.len() {
        return Some(ReconfigurationReason::AddressCount {
            old: old.addresses.len(),
            new: new.addresses.len(),
        });
    }

    let wifi = old.kind == InterfaceKind::Wifi || new.kind == InterfaceKind::Wifi;
    old.addresses
        .iter()
        .zip(&new.addresses)
        .find_map(|(o, n)| compare_address(o, n, wifi))
}

fn compare_address(
    old: &InterfaceAddressConfig,
    new: &InterfaceAddressConfig,
    wifi: bool,
) -> Option<ReconfigurationReason> {
    let active = wifi.then_some(new.wifi_mode);
    if wifi && old.wifi_mode != new.wifi_mode {
        return Some(ReconfigurationReason::WifiModeChanged {
            old: old.wifi_mode,
            new: new.wifi_mode,
        });
    }

    let old_configs = relevant(&old.configs, active);
    let new_configs = relevant(&new.configs, active);
    if old_configs.len() != new_configs.len() {
        return Some(ReconfigurationReason::FragmentCount {
            old: old_configs.len(),
            new: new_configs.len(),
        });
    }

    for o in &old_configs {
        let Some(n) = new_configs.iter().find(|n| same_slot(o, n)) else {
            return Some(ReconfigurationReason::FragmentMissing(o.kind()));
        };
        if !equivalent(o, n) {
            return Some(ReconfigurationReason::FragmentChanged(o.kind()));
        }
    }
    None
}

/// Fragments that take part in the comparison: WiFi fragments only for the
/// active mode.
fn relevant(configs: &[NetConfig], active: Option<WifiMode>) -> Vec<&NetConfig> {
    configs
        .iter()
        .filter(|c| match (c, active) {
            (NetConfig::Wifi(w), Some(mode)) => w.mode == mode,
            _ => true,
        })
        .collect()
}

fn same_slot(a: &NetConfig, b: &NetConfig) -> bool {
    match (a, b) {
        (NetConfig::Wifi(x), NetConfig::Wifi(y)) => x.mode == y.mode,
        _ => a.kind() == b.kind(),
    }
}

fn equivalent(a: &NetConfig, b: &NetConfig) -> bool {
    match (a, b) {
        (NetConfig::AutoNat(_), NetConfig::AutoNat(_)) => true,
        (NetConfig::DhcpServer4(x), NetConfig::DhcpServer4(y)) => x.equivalent(y),
        _ => a == b,
    }
}

/// Names of interfaces accepted by `filter` on either side whose
/// configuration changed, new interfaces first in configuration order.
pub fn changed_interfaces<F>(
    old: &NetworkConfiguration,
    new: &NetworkConfiguration,
    filter: F,
) -> Vec<String>
where
    F: Fn(&InterfaceConfig) -> bool,
{
    let removed = old
        .interfaces()
        .filter(|i| new.interface(&i.name).is_none());

    new.interfaces()
        .chain(removed)
        .filter(|i| filter(i))
        .filter_map(|i| {
            let reason = reconfiguration_reason(old.interface(&i.name), new.interface(&i.name))?;
            tracing::debug!(interface = %i.name, %reason, "reconfiguration needed");
            Some(i.name.clone())
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::model::{
        DhcpServerConfig4, FirewallAutoNatConfig, NetConfigIp4, NetInterfaceStatus, WifiConfig,
    };
    use pretty_assertions::assert_eq;

    fn lan(name: &str, dhcp_server: DhcpServerConfig4) -> InterfaceConfig {
        InterfaceConfig::new(name, InterfaceKind::Ethernet).with_configs(vec![
            NetConfigIp4::new(NetInterfaceStatus::EnabledLan, false)
                .with_static(Ipv4Addr::new(172, 16, 0, 1), 24, None)
                .into(),
            dhcp_server.into(),
            FirewallAutoNatConfig::new(name).into(),
        ])
    }

    fn server(enabled: bool) -> DhcpServerConfig4 {
        DhcpServerConfig4::new(
            "eth1",
            enabled,
            Ipv4Addr::new(172, 16, 0, 1),
            24,
            Ipv4Addr::new(172, 16, 0, 100),
            Ipv4Addr::new(172, 16, 0, 200),
        )
    }

    fn wlan(mode: WifiMode, master_ssid: &str, infra_ssid: &str) -> InterfaceConfig {
        InterfaceConfig::new("wlan0", InterfaceKind::Wifi)
            .with_configs(vec![
                WifiConfig::new(WifiMode::Master, master_ssid).into(),
                WifiConfig::new(WifiMode::Infra, infra_ssid).into(),
            ])
            .with_wifi_mode(mode)
    }

    #[test]
    fn presence_rules() {
        let a = lan("eth1", server(true));
        assert!(!needs_reconfiguration(None, None));
        assert_eq!(
            reconfiguration_reason(None, Some(&a)),
            Some(ReconfigurationReason::Added)
        );
        assert_eq!(
            reconfiguration_reason(Some(&a), None),
            Some(ReconfigurationReason::Removed)
        );
        assert!(!needs_reconfiguration(Some(&a), Some(&a.clone())));
    }

    #[test]
    fn empty_address_lists_are_unchanged() {
        let a = InterfaceConfig::new("lo", InterfaceKind::Loopback);
        let b = InterfaceConfig::new("lo", InterfaceKind::Loopback);
        assert!(!needs_reconfiguration(Some(&a), Some(&b)));
    }

    #[test]
    fn disabled_dhcp_servers_never_differ() {
        let mut other = server(false);
        other.default_lease_time = 3600;
        other.range_end = Ipv4Addr::new(172, 16, 0, 150);
        let a = lan("eth1", server(false));
        let b = lan("eth1", other);
        assert!(!needs_reconfiguration(Some(&a), Some(&b)));
    }

    #[test]
    fn enabled_dhcp_server_change_is_detected() {
        let mut other = server(true);
        other.default_lease_time = 3600;
        let a = lan("eth1", server(true));
        let b = lan("eth1", other);
        assert_eq!(
            reconfiguration_reason(Some(&a), Some(&b)),
            Some(ReconfigurationReason::FragmentChanged(NetConfigKind::DhcpServer4))
        );
    }

    #[test]
    fn auto_nat_is_not_compared() {
        let a = lan("eth1", server(true));
        let mut b = a.clone();
        if let NetConfig::AutoNat(nat) = &mut b.addresses[0].configs[2] {
            nat.destination_interface = "wwan0".into();
        }
        assert!(!needs_reconfiguration(Some(&a), Some(&b)));
    }

    #[test]
    fn inactive_wifi_mode_is_ignored() {
        let a = wlan(WifiMode::Master, "gw", "uplink");
        let b = wlan(WifiMode::Master, "gw", "other-uplink");
        assert!(!needs_reconfiguration(Some(&a), Some(&b)));
    }

    #[test]
    fn active_wifi_mode_change_is_detected() {
        let a = wlan(WifiMode::Master, "gw", "uplink");
        let b = wlan(WifiMode::Master, "gw-2", "uplink");
        assert_eq!(
            reconfiguration_reason(Some(&a), Some(&b)),
            Some(ReconfigurationReason::FragmentChanged(NetConfigKind::Wifi))
        );

        let c = wlan(WifiMode::Infra, "gw", "uplink");
        assert!(matches!(
            reconfiguration_reason(Some(&a), Some(&c)),
            Some(ReconfigurationReason::WifiModeChanged { .. })
        ));
    }

    #[test]
    fn changed_interfaces_applies_filter() {
        let mut old = NetworkConfiguration::new();
        old.add_interface(lan("eth0", server(true)));
        old.add_interface(lan("eth1", server(true)));
        old.add_interface(wlan(WifiMode::Master, "gw", "uplink"));

        let mut new = NetworkConfiguration::new();
        let mut eth1 = server(true);
        eth1.max_lease_time = 10;
        new.add_interface(lan("eth1", eth1));
        new.add_interface(wlan(WifiMode::Master, "gw-2", "uplink"));

        let ethernet = changed_interfaces(&old, &new, |i| i.kind == InterfaceKind::Ethernet);
        assert_eq!(ethernet, vec!["eth1", "eth0"]);

        let wifi = changed_interfaces(&old, &new, |i| i.kind == InterfaceKind::Wifi);
        assert_eq!(wifi, vec!["wlan0"]);
    }
}
