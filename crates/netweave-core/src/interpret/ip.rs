// ── IPv4 / IPv6 / DHCP-server / auto-NAT interpreter ──

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{NetError, Result};
use crate::model::{
    DhcpServerConfig4, FirewallAutoNatConfig, NetConfig, NetConfigIp4, NetConfigIp6,
    NetInterfaceStatus,
};
use crate::properties::{config_key, join_addresses, Properties};

/// Facts about the interface that the IP keys alone do not carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct IpContext {
    /// Address currently assigned by the OS. Serves as the DHCP-server
    /// router address when the interface is itself a DHCP client.
    pub observed_address: Option<Ipv4Addr>,
    /// Virtual interfaces without an explicit status are unmanaged.
    pub is_virtual: bool,
}

pub fn parse(props: &Properties, name: &str, ctx: IpContext) -> Result<Vec<NetConfig>> {
    let key = |suffix: &str| config_key(name, suffix);
    let mut configs = Vec::new();

    let ip4 = parse_ip4(props, name, ctx)?;
    let ip4_static = (ip4.address, ip4.prefix);
    configs.push(NetConfig::Ip4(ip4));

    if props.bool_or(&key("nat.enabled"), false)? {
        configs.push(FirewallAutoNatConfig::new(name).into());
    }

    if props.contains_key(&key("dhcpServer4.enabled")) {
        let dhcp_client = props.bool_or(&key("dhcpClient4.enabled"), false)?;
        let router = if dhcp_client {
            ctx.observed_address
        } else {
            ip4_static.0
        };
        if let Some(server) = parse_dhcp_server(props, name, router, ip4_static.1)? {
            configs.push(server.into());
        }
    }

    configs.push(NetConfig::Ip6(parse_ip6(props, name)?));
    Ok(configs)
}

fn parse_ip4(props: &Properties, name: &str, ctx: IpContext) -> Result<NetConfigIp4> {
    let key = |suffix: &str| config_key(name, suffix);

    let default_status = if ctx.is_virtual {
        NetInterfaceStatus::Unmanaged
    } else {
        NetInterfaceStatus::Disabled
    };
    let status = props
        .parse::<NetInterfaceStatus>(&key("ip4.status"))?
        .unwrap_or(default_status);
    let dhcp = props.bool_or(&key("dhcpClient4.enabled"), false)?;

    let mut ip4 = NetConfigIp4::new(status, dhcp);
    if !dhcp {
        ip4.address = props.address(&key("ip4.address"))?;
        ip4.prefix = parse_prefix(props, &key("ip4.prefix"), 32)?.unwrap_or(0);
        ip4.gateway = props.address(&key("ip4.gateway"))?;
    }
    ip4.dns_servers = props.addresses(&key("ip4.dnsServers"))?;
    ip4.wins_servers = props.addresses(&key("ip4.winsServers"))?;
    ip4.domains = props.list(&key("ip4.domains"));
    Ok(ip4)
}

fn parse_ip6(props: &Properties, name: &str) -> Result<NetConfigIp6> {
    let key = |suffix: &str| config_key(name, suffix);

    let status = match props.text(&key("ip6.status")) {
        Some(token) => NetInterfaceStatus::from_ip6_token(&token).map_err(|_| {
            NetError::invalid_property(key("ip6.status"), token.clone(), "unrecognised value")
        })?,
        None => NetInterfaceStatus::Disabled,
    };
    let dhcp = props.bool_or(&key("dhcpClient6.enabled"), false)?;

    let mut ip6 = NetConfigIp6::new(status, dhcp);
    if !dhcp {
        ip6.address = props.address::<Ipv6Addr>(&key("ip6.address"))?;
        ip6.dns_servers = props.addresses(&key("ip6.dnsServers"))?;
        ip6.domains = props.list(&key("ip6.domains"));
    }
    Ok(ip6)
}

/// The server exists only when the router address and both range bounds
/// are known. A structurally invalid server is dropped with a warning.
fn parse_dhcp_server(
    props: &Properties,
    name: &str,
    router: Option<Ipv4Addr>,
    fallback_prefix: u8,
) -> Result<Option<DhcpServerConfig4>> {
    let key = |suffix: &str| config_key(name, suffix);

    let enabled = props.bool_or(&key("dhcpServer4.enabled"), false)?;
    let prefix = parse_prefix(props, &key("dhcpServer4.prefix"), 32)?.unwrap_or(fallback_prefix);
    let start: Option<Ipv4Addr> = props.address(&key("dhcpServer4.rangeStart"))?;
    let end: Option<Ipv4Addr> = props.address(&key("dhcpServer4.rangeEnd"))?;

    let (Some(router), Some(start), Some(end)) = (router, start, end) else {
        tracing::debug!(interface = name, "DHCP server keys incomplete, no server configured");
        return Ok(None);
    };

    let mut server = DhcpServerConfig4::new(name, enabled, router, prefix, start, end);
    server.default_lease_time = props.int_or(&key("dhcpServer4.defaultLeaseTime"), -1)?;
    server.max_lease_time = props.int_or(&key("dhcpServer4.maxLeaseTime"), -1)?;
    server.pass_dns = props.bool_or(&key("dhcpServer4.passDns"), false)?;

    if !server.is_valid() {
        tracing::warn!(
            interface = name,
            start = %server.range_start,
            end = %server.range_end,
            subnet = %server.subnet,
            "ignoring invalid DHCP server configuration"
        );
        return Ok(None);
    }
    Ok(Some(server))
}

fn parse_prefix(props: &Properties, key: &str, max: u8) -> Result<Option<u8>> {
    match props.int::<u8>(key)? {
        Some(p) if p > max => Err(NetError::invalid_property(
            key,
            p.to_string(),
            format!("prefix length above {max}"),
        )),
        other => Ok(other),
    }
}

// ── Serialization ────────────────────────────────────────────────────

pub fn serialize(configs: &[NetConfig], name: &str, props: &mut Properties) {
    let key = |suffix: &str| config_key(name, suffix);

    let nat = configs.iter().any(|c| matches!(c, NetConfig::AutoNat(_)));
    let mut wrote_ip = false;

    for config in configs {
        match config {
            NetConfig::Ip4(ip4) => {
                wrote_ip = true;
                props.insert(key("ip4.status"), ip4.status.to_string());
                props.insert(key("dhcpClient4.enabled"), ip4.dhcp);
                if !ip4.dhcp {
                    props.insert(key("ip4.address"), opt_text(ip4.address));
                    props.insert(key("ip4.prefix"), ip4.prefix);
                    props.insert(key("ip4.gateway"), opt_text(ip4.gateway));
                }
                props.insert(key("ip4.dnsServers"), join_addresses(&ip4.dns_servers));
                props.insert(key("ip4.winsServers"), join_addresses(&ip4.wins_servers));
                props.insert(key("ip4.domains"), ip4.domains.join(","));
            }
            NetConfig::Ip6(ip6) => {
                props.insert(key("ip6.status"), ip6.status.ip6_token());
                props.insert(key("dhcpClient6.enabled"), ip6.dhcp);
                if !ip6.dhcp {
                    props.insert(key("ip6.address"), opt_text(ip6.address));
                    props.insert(key("ip6.dnsServers"), join_addresses(&ip6.dns_servers));
                    props.insert(key("ip6.domains"), ip6.domains.join(","));
                }
            }
            NetConfig::DhcpServer4(server) => {
                props.insert(key("dhcpServer4.enabled"), server.enabled);
                props.insert(key("dhcpServer4.defaultLeaseTime"), server.default_lease_time);
                props.insert(key("dhcpServer4.maxLeaseTime"), server.max_lease_time);
                props.insert(key("dhcpServer4.prefix"), server.prefix);
                props.insert(key("dhcpServer4.rangeStart"), server.range_start.to_string());
                props.insert(key("dhcpServer4.rangeEnd"), server.range_end.to_string());
                props.insert(key("dhcpServer4.passDns"), server.pass_dns);
            }
            _ => {}
        }
    }

    if wrote_ip {
        props.insert(key("nat.enabled"), nat);
    }
}

fn opt_text<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
