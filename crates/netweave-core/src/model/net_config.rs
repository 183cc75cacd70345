use serde::Serialize;
use strum::Display;

use super::dhcp::DhcpServerConfig4;
use super::firewall::{FirewallAutoNatConfig, NatRule};
use super::ip::{NetConfigIp4, NetConfigIp6};
use super::modem::ModemConfig;
use super::wifi::WifiConfig;

/// One protocol configuration fragment attached to an interface address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetConfig {
    Ip4(NetConfigIp4),
    Ip6(NetConfigIp6),
    Wifi(WifiConfig),
    Modem(ModemConfig),
    DhcpServer4(DhcpServerConfig4),
    AutoNat(FirewallAutoNatConfig),
    Nat(NatRule),
}

/// Discriminant of [`NetConfig`], used to pair fragments of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NetConfigKind {
    Ip4,
    Ip6,
    Wifi,
    Modem,
    DhcpServer4,
    AutoNat,
    Nat,
}

impl NetConfig {
    pub fn kind(&self) -> NetConfigKind {
        match self {
            Self::Ip4(_) => NetConfigKind::Ip4,
            Self::Ip6(_) => NetConfigKind::Ip6,
            Self::Wifi(_) => NetConfigKind::Wifi,
            Self::Modem(_) => NetConfigKind::Modem,
            Self::DhcpServer4(_) => NetConfigKind::DhcpServer4,
            Self::AutoNat(_) => NetConfigKind::AutoNat,
            Self::Nat(_) => NetConfigKind::Nat,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Self::Wifi(w) => w.is_valid(),
            Self::Modem(m) => m.is_valid(),
            Self::DhcpServer4(d) => d.is_valid(),
            _ => true,
        }
    }
}

impl From<NetConfigIp4> for NetConfig {
    fn from(c: NetConfigIp4) -> Self {
        Self::Ip4(c)
    }
}

impl From<NetConfigIp6> for NetConfig {
    fn from(c: NetConfigIp6) -> Self {
        Self::Ip6(c)
    }
}

impl From<WifiConfig> for NetConfig {
    fn from(c: WifiConfig) -> Self {
        Self::Wifi(c)
    }
}

impl From<ModemConfig> for NetConfig {
    fn from(c: ModemConfig) -> Self {
        Self::Modem(c)
    }
}

impl From<DhcpServerConfig4> for NetConfig {
    fn from(c: DhcpServerConfig4) -> Self {
        Self::DhcpServer4(c)
    }
}

impl From<FirewallAutoNatConfig> for NetConfig {
    fn from(c: FirewallAutoNatConfig) -> Self {
        Self::AutoNat(c)
    }
}
