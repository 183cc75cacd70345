use std::net::Ipv4Addr;

use serde::Serialize;

use super::ip::{network_of, prefix_to_netmask};

/// DHCP server attached to a LAN interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpServerConfig4 {
    pub interface_name: String,
    pub enabled: bool,
    pub subnet: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub prefix: u8,
    pub router_address: Ipv4Addr,
    pub range_start: Ipv4Addr,
    pub range_end: Ipv4Addr,
    /// Seconds; `-1` when unset.
    pub default_lease_time: i32,
    /// Seconds; `-1` when unset.
    pub max_lease_time: i32,
    /// Offer the router as DNS server and let the forwarder accept this subnet.
    pub pass_dns: bool,
    pub dns_servers: Vec<Ipv4Addr>,
}

impl DhcpServerConfig4 {
    /// Build a server config around `router_address`, deriving subnet and mask.
    pub fn new(
        interface_name: impl Into<String>,
        enabled: bool,
        router_address: Ipv4Addr,
        prefix: u8,
        range_start: Ipv4Addr,
        range_end: Ipv4Addr,
    ) -> Self {
        Self {
            interface_name: interface_name.into(),
            enabled,
            subnet: network_of(router_address, prefix),
            subnet_mask: prefix_to_netmask(prefix),
            prefix,
            router_address,
            range_start,
            range_end,
            default_lease_time: -1,
            max_lease_time: -1,
            pass_dns: false,
            dns_servers: vec![router_address],
        }
    }

    /// Range ordered and inside the served subnet.
    pub fn is_valid(&self) -> bool {
        u32::from(self.range_start) <= u32::from(self.range_end)
            && network_of(self.range_start, self.prefix) == self.subnet
            && network_of(self.range_end, self.prefix) == self.subnet
    }

    /// Equality used by the diff engine: two disabled servers never differ.
    pub fn equivalent(&self, other: &Self) -> bool {
        (!self.enabled && !other.enabled) || self == other
    }
}
