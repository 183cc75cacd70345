// ── IP-layer configuration fragments ──

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::NetError;

/// Administrative mode of an interface's IP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString)]
pub enum NetInterfaceStatus {
    #[strum(serialize = "netIPv4StatusDisabled")]
    Disabled,
    #[strum(serialize = "netIPv4StatusUnmanaged")]
    Unmanaged,
    #[strum(serialize = "netIPv4StatusL2Only")]
    L2Only,
    #[strum(serialize = "netIPv4StatusEnabledLAN")]
    EnabledLan,
    #[strum(serialize = "netIPv4StatusEnabledWAN")]
    EnabledWan,
    #[default]
    #[strum(serialize = "netIPv4StatusUnknown")]
    Unknown,
}

impl NetInterfaceStatus {
    /// True for LAN and WAN, the two states the loops bring up.
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::EnabledLan | Self::EnabledWan)
    }

    /// Token used under `ip6.status`.
    pub fn ip6_token(self) -> String {
        self.to_string().replacen("netIPv4", "netIPv6", 1)
    }

    /// Parse an `ip6.status` token.
    pub fn from_ip6_token(token: &str) -> Result<Self, NetError> {
        token
            .replacen("netIPv6", "netIPv4", 1)
            .parse()
            .map_err(|_| NetError::Unsupported {
                what: format!("IPv6 status {token}"),
            })
    }

    /// Interfaces in these states come up on boot.
    pub fn autoconnect(self) -> bool {
        matches!(self, Self::EnabledLan | Self::EnabledWan | Self::L2Only)
    }
}

// ── IPv4 ─────────────────────────────────────────────────────────────

/// IPv4 settings of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NetConfigIp4 {
    pub status: NetInterfaceStatus,
    pub autoconnect: bool,
    /// DHCP client enabled. When set, the static fields stay empty.
    pub dhcp: bool,
    pub address: Option<Ipv4Addr>,
    pub prefix: u8,
    pub gateway: Option<Ipv4Addr>,
    pub dns_servers: Vec<Ipv4Addr>,
    pub wins_servers: Vec<Ipv4Addr>,
    pub domains: Vec<String>,
}

impl NetConfigIp4 {
    pub fn new(status: NetInterfaceStatus, dhcp: bool) -> Self {
        Self {
            status,
            autoconnect: status.autoconnect(),
            dhcp,
            ..Self::default()
        }
    }

    pub fn with_static(mut self, address: Ipv4Addr, prefix: u8, gateway: Option<Ipv4Addr>) -> Self {
        self.address = Some(address);
        self.prefix = prefix;
        self.gateway = gateway;
        self
    }

    /// Netmask derived from the prefix length.
    pub fn netmask(&self) -> Ipv4Addr {
        prefix_to_netmask(self.prefix)
    }
}

// ── IPv6 ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NetConfigIp6 {
    pub status: NetInterfaceStatus,
    pub autoconnect: bool,
    pub dhcp: bool,
    pub address: Option<Ipv6Addr>,
    pub dns_servers: Vec<Ipv6Addr>,
    pub domains: Vec<String>,
}

impl NetConfigIp6 {
    pub fn new(status: NetInterfaceStatus, dhcp: bool) -> Self {
        Self {
            status,
            autoconnect: status.autoconnect(),
            dhcp,
            ..Self::default()
        }
    }
}

/// Netmask for an IPv4 prefix length; lengths above 32 saturate.
pub fn prefix_to_netmask(prefix: u8) -> Ipv4Addr {
    let bits = u32::from(prefix.min(32));
    let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
    Ipv4Addr::from(mask)
}

/// Network address of `addr` under `prefix`.
pub fn network_of(addr: Ipv4Addr, prefix: u8) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(addr) & u32::from(prefix_to_netmask(prefix)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_tokens_round_trip_for_both_families() {
        let s: NetInterfaceStatus = "netIPv4StatusEnabledWAN".parse().unwrap();
        assert_eq!(s, NetInterfaceStatus::EnabledWan);
        assert_eq!(s.ip6_token(), "netIPv6StatusEnabledWAN");
        assert_eq!(
            NetInterfaceStatus::from_ip6_token("netIPv6StatusL2Only").unwrap(),
            NetInterfaceStatus::L2Only
        );
    }

    #[test]
    fn netmask_from_prefix() {
        assert_eq!(prefix_to_netmask(24), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(prefix_to_netmask(0), Ipv4Addr::UNSPECIFIED);
        assert_eq!(prefix_to_netmask(32), Ipv4Addr::BROADCAST);
        assert_eq!(
            network_of(Ipv4Addr::new(192, 168, 1, 77), 24),
            Ipv4Addr::new(192, 168, 1, 0)
        );
    }

    #[test]
    fn autoconnect_follows_status() {
        assert!(NetConfigIp4::new(NetInterfaceStatus::L2Only, false).autoconnect);
        assert!(!NetConfigIp4::new(NetInterfaceStatus::Disabled, false).autoconnect);
    }
}
