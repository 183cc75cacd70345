// ── Firewall domain types ──

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::Serialize;
use strum::{Display, EnumString};

/// Address family a rule set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display)]
pub enum AddressFamily {
    #[default]
    #[strum(serialize = "ipv4")]
    Ipv4,
    #[strum(serialize = "ipv6")]
    Ipv6,
}

impl AddressFamily {
    /// The "any" network literal (`0.0.0.0/0` or `::/0`).
    pub fn any_network(self) -> IpNet {
        match self {
            Self::Ipv4 => IpNet::V4(ipnet::Ipv4Net::default()),
            Self::Ipv6 => IpNet::V6(ipnet::Ipv6Net::default()),
        }
    }

    pub fn matches(self, addr: &IpAddr) -> bool {
        matches!(
            (self, addr),
            (Self::Ipv4, IpAddr::V4(_)) | (Self::Ipv6, IpAddr::V6(_))
        )
    }

    /// Property key prefix: `firewall.` or `firewall.ipv6.`.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Ipv4 => "firewall.",
            Self::Ipv6 => "firewall.ipv6.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    Tcp,
    Udp,
    All,
}

/// A single port or an inclusive `start:end` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PortSpec {
    Single(u16),
    Range { start: u16, end: u16 },
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(p) => write!(f, "{p}"),
            Self::Range { start, end } => write!(f, "{start}:{end}"),
        }
    }
}

impl FromStr for PortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((start, end)) = s.split_once(':') {
            let start: u16 = start
                .trim()
                .parse()
                .map_err(|_| format!("invalid range start {start:?}"))?;
            let end: u16 = end
                .trim()
                .parse()
                .map_err(|_| format!("invalid range end {end:?}"))?;
            if start > end {
                return Err(format!("range {start}:{end} is reversed"));
            }
            Ok(Self::Range { start, end })
        } else {
            s.parse()
                .map(Self::Single)
                .map_err(|_| format!("invalid port {s:?}"))
        }
    }
}

/// Which interfaces an open port accepts traffic on. A rule can name a
/// permitted interface or an excluded one, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub enum InterfaceRestriction {
    #[default]
    Any,
    Permitted(String),
    Unpermitted(String),
}

// ── Rules ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OpenPortRule {
    pub port: PortSpec,
    pub protocol: Protocol,
    /// `None` means any network.
    pub permitted_network: Option<IpNet>,
    pub interface: InterfaceRestriction,
    pub permitted_mac: Option<String>,
    pub source_port_range: Option<PortSpec>,
}

impl OpenPortRule {
    pub fn new(port: PortSpec, protocol: Protocol) -> Self {
        Self {
            port,
            protocol,
            permitted_network: None,
            interface: InterfaceRestriction::Any,
            permitted_mac: None,
            source_port_range: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PortForwardRule {
    pub inbound_interface: String,
    pub outbound_interface: String,
    pub address: IpAddr,
    pub protocol: Protocol,
    pub inbound_port: u16,
    pub outbound_port: u16,
    pub masquerade: bool,
    pub permitted_network: Option<IpNet>,
    pub permitted_mac: Option<String>,
    pub source_port_range: Option<PortSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NatRule {
    pub source_interface: String,
    pub destination_interface: String,
    pub protocol: Protocol,
    pub source: Option<IpNet>,
    pub destination: Option<IpNet>,
    pub masquerade: bool,
}

/// NAT implied by `nat.enabled` on an interface; the destination is
/// resolved later from the WAN interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallAutoNatConfig {
    pub source_interface: String,
    pub destination_interface: String,
    pub masquerade: bool,
}

impl FirewallAutoNatConfig {
    pub const UNRESOLVED_DESTINATION: &'static str = "unknown";

    pub fn new(source_interface: impl Into<String>) -> Self {
        Self {
            source_interface: source_interface.into(),
            destination_interface: Self::UNRESOLVED_DESTINATION.into(),
            masquerade: true,
        }
    }
}

// ── FirewallConfiguration ────────────────────────────────────────────

/// All firewall rules for one address family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FirewallConfiguration {
    pub family: AddressFamily,
    pub open_ports: Vec<OpenPortRule>,
    pub port_forwards: Vec<PortForwardRule>,
    pub nat: Vec<NatRule>,
}

impl FirewallConfiguration {
    pub fn new(family: AddressFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open_ports.is_empty() && self.port_forwards.is_empty() && self.nat.is_empty()
    }
}

/// Check a MAC address of the form `aa:bb:cc:dd:ee:ff`.
pub fn is_valid_mac(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}
