// ── Firewall rule codec ──
//
// Rule lists travel as `record;record;...` where each record is a fixed,
// positional, comma-separated field list closed by a `#` field:
//
//   open port     port|start:end,protocol,network/prefix,permittedIface,
//                 unpermittedIface,permittedMac,sourcePortRange,#
//   port forward  inIface,outIface,address,protocol,inPort,outPort,
//                 masquerade,network/prefix,permittedMac,sourcePortRange,#
//   NAT           srcIface,dstIface,protocol,source,destination,masquerade,#
//
// Decoding is best-effort per record: a malformed record is logged and
// skipped, the rest of the list still decodes. Missing trailing fields
// mean "not set".

use std::net::IpAddr;

use ipnet::IpNet;

use crate::error::{NetError, Result};
use crate::model::firewall::is_valid_mac;
use crate::model::{
    AddressFamily, InterfaceRestriction, NatRule, OpenPortRule, PortForwardRule, PortSpec,
    Protocol,
};

pub const RECORD_SEPARATOR: char = ';';
pub const FIELD_SEPARATOR: char = ',';
pub const RECORD_TERMINATOR: &str = "#";

const OPEN_PORT_FIELDS: usize = 7;
const PORT_FORWARD_FIELDS: usize = 10;
const NAT_FIELDS: usize = 6;

/// Rules decoded from one list, plus the records that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub rules: Vec<T>,
    pub skipped: Vec<NetError>,
}

impl<T> Default for Decoded<T> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

fn decode_list<T>(
    raw: &str,
    kind: &'static str,
    mut decode_record: impl FnMut(&str) -> Result<T>,
) -> Decoded<T> {
    let mut out = Decoded::default();
    for record in raw.split(RECORD_SEPARATOR).map(str::trim).filter(|r| !r.is_empty()) {
        match decode_record(record) {
            Ok(rule) => out.rules.push(rule),
            Err(error) => {
                tracing::warn!(kind, record, %error, "skipping malformed firewall record");
                out.skipped.push(error);
            }
        }
    }
    out
}

/// Split a record into exactly `expected` fields, dropping the closing
/// `#` and padding missing trailing fields with "".
fn fields(record: &str, expected: usize) -> Result<Vec<&str>> {
    let mut parts: Vec<&str> = record.split(FIELD_SEPARATOR).map(str::trim).collect();
    if parts.last() == Some(&RECORD_TERMINATOR) {
        parts.pop();
    }
    if parts.len() > expected {
        return Err(NetError::firewall(
            record,
            format!("expected at most {expected} fields, found {}", parts.len()),
        ));
    }
    parts.resize(expected, "");
    Ok(parts)
}

fn optional(field: &str) -> Option<String> {
    (!field.is_empty()).then(|| field.to_owned())
}

fn protocol(record: &str, field: &str) -> Result<Protocol> {
    field
        .parse()
        .map_err(|_| NetError::firewall(record, format!("unknown protocol {field:?}")))
}

fn port(record: &str, field: &str, what: &str) -> Result<u16> {
    field
        .parse()
        .map_err(|_| NetError::firewall(record, format!("invalid {what} {field:?}")))
}

fn port_spec(record: &str, field: &str) -> Result<Option<PortSpec>> {
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|reason: String| NetError::firewall(record, reason))
}

fn mac(record: &str, field: &str) -> Result<Option<String>> {
    match optional(field) {
        Some(m) if !is_valid_mac(&m) => {
            Err(NetError::firewall(record, format!("invalid MAC address {m:?}")))
        }
        other => Ok(other),
    }
}

fn masquerade(field: &str) -> bool {
    field.eq_ignore_ascii_case("true")
}

/// `addr/prefix` or a bare address. The family's "any" network reads as
/// unrestricted.
fn network(record: &str, field: &str, family: Option<AddressFamily>) -> Result<Option<IpNet>> {
    if field.is_empty() {
        return Ok(None);
    }
    let net = field
        .parse::<IpNet>()
        .ok()
        .or_else(|| field.parse::<IpAddr>().ok().and_then(host_network))
        .ok_or_else(|| NetError::firewall(record, format!("invalid network {field:?}")))?;
    if let Some(family) = family {
        if !family.matches(&net.addr()) {
            return Err(NetError::firewall(
                record,
                format!("network {net} is not {family}"),
            ));
        }
        if net == family.any_network() {
            return Ok(None);
        }
    }
    Ok(Some(net))
}

fn host_network(addr: IpAddr) -> Option<IpNet> {
    let prefix = if addr.is_ipv4() { 32 } else { 128 };
    IpNet::new(addr, prefix).ok()
}

fn join_record(fields: &[String]) -> String {
    let mut out = fields.join(",");
    out.push(FIELD_SEPARATOR);
    out.push_str(RECORD_TERMINATOR);
    out
}

fn join_records(records: impl Iterator<Item = String>) -> String {
    records.collect::<Vec<_>>().join(";")
}

fn net_text(net: Option<&IpNet>) -> String {
    net.map(ToString::to_string).unwrap_or_default()
}

fn opt_text<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

// ── Open ports ───────────────────────────────────────────────────────

pub fn decode_open_ports(raw: &str, family: AddressFamily) -> Decoded<OpenPortRule> {
    decode_list(raw, "open port", |record| decode_open_port(record, family))
}

pub fn decode_open_port(record: &str, family: AddressFamily) -> Result<OpenPortRule> {
    let f = fields(record, OPEN_PORT_FIELDS)?;

    let port = f[0]
        .parse::<PortSpec>()
        .map_err(|reason| NetError::firewall(record, reason))?;
    let interface = match (optional(f[3]), optional(f[4])) {
        (Some(_), Some(_)) => {
            return Err(NetError::firewall(
                record,
                "permitted and unpermitted interface are mutually exclusive",
            ));
        }
        (Some(i), None) => InterfaceRestriction::Permitted(i),
        (None, Some(i)) => InterfaceRestriction::Unpermitted(i),
        (None, None) => InterfaceRestriction::Any,
    };

    Ok(OpenPortRule {
        port,
        protocol: protocol(record, f[1])?,
        permitted_network: network(record, f[2], Some(family))?,
        interface,
        permitted_mac: mac(record, f[5])?,
        source_port_range: port_spec(record, f[6])?,
    })
}

pub fn encode_open_ports(rules: &[OpenPortRule]) -> String {
    join_records(rules.iter().map(|r| {
        let (permitted, unpermitted) = match &r.interface {
            InterfaceRestriction::Any => (String::new(), String::new()),
            InterfaceRestriction::Permitted(i) => (i.clone(), String::new()),
            InterfaceRestriction::Unpermitted(i) => (String::new(), i.clone()),
        };
        join_record(&[
            r.port.to_string(),
            r.protocol.to_string(),
            net_text(r.permitted_network.as_ref()),
            permitted,
            unpermitted,
            r.permitted_mac.clone().unwrap_or_default(),
            opt_text(r.source_port_range.as_ref()),
        ])
    }))
}

// ── Port forwards ────────────────────────────────────────────────────

pub fn decode_port_forwards(raw: &str, family: AddressFamily) -> Decoded<PortForwardRule> {
    decode_list(raw, "port forward", |record| decode_port_forward(record, family))
}

pub fn decode_port_forward(record: &str, family: AddressFamily) -> Result<PortForwardRule> {
    let f = fields(record, PORT_FORWARD_FIELDS)?;

    let address: IpAddr = f[2]
        .parse()
        .map_err(|_| NetError::firewall(record, format!("invalid address {:?}", f[2])))?;
    if !family.matches(&address) {
        return Err(NetError::firewall(record, format!("address {address} is not {family}")));
    }

    Ok(PortForwardRule {
        inbound_interface: f[0].to_owned(),
        outbound_interface: f[1].to_owned(),
        address,
        protocol: protocol(record, f[3])?,
        inbound_port: port(record, f[4], "inbound port")?,
        outbound_port: port(record, f[5], "outbound port")?,
        masquerade: masquerade(f[6]),
        permitted_network: network(record, f[7], Some(family))?,
        permitted_mac: mac(record, f[8])?,
        source_port_range: port_spec(record, f[9])?,
    })
}

pub fn encode_port_forwards(rules: &[PortForwardRule]) -> String {
    join_records(rules.iter().map(|r| {
        join_record(&[
            r.inbound_interface.clone(),
            r.outbound_interface.clone(),
            r.address.to_string(),
            r.protocol.to_string(),
            r.inbound_port.to_string(),
            r.outbound_port.to_string(),
            r.masquerade.to_string(),
            net_text(r.permitted_network.as_ref()),
            r.permitted_mac.clone().unwrap_or_default(),
            opt_text(r.source_port_range.as_ref()),
        ])
    }))
}

// ── NAT ──────────────────────────────────────────────────────────────

pub fn decode_nat(raw: &str) -> Decoded<NatRule> {
    decode_list(raw, "nat", decode_nat_record)
}

pub fn decode_nat_record(record: &str) -> Result<NatRule> {
    let f = fields(record, NAT_FIELDS)?;
    let protocol = if f[2].is_empty() {
        Protocol::All
    } else {
        protocol(record, f[2])?
    };
    Ok(NatRule {
        source_interface: f[0].to_owned(),
        destination_interface: f[1].to_owned(),
        protocol,
        source: network(record, f[3], None)?,
        destination: network(record, f[4], None)?,
        masquerade: masquerade(f[5]),
    })
}

/// NAT fields are joined with `,` like every other list so that the
/// output decodes again.
pub fn encode_nat(rules: &[NatRule]) -> String {
    join_records(rules.iter().map(|r| {
        join_record(&[
            r.source_interface.clone(),
            r.destination_interface.clone(),
            r.protocol.to_string(),
            net_text(r.source.as_ref()),
            net_text(r.destination.as_ref()),
            r.masquerade.to_string(),
        ])
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const V4: AddressFamily = AddressFamily::Ipv4;

    #[test]
    fn open_port_example_decodes_two_rules() {
        let decoded = decode_open_ports("22,tcp,,,,,#;80,tcp,,eth0,,,#", V4);
        assert!(decoded.skipped.is_empty());
        assert_eq!(
            decoded.rules,
            vec![
                OpenPortRule::new(PortSpec::Single(22), Protocol::Tcp),
                OpenPortRule {
                    interface: InterfaceRestriction::Permitted("eth0".into()),
                    ..OpenPortRule::new(PortSpec::Single(80), Protocol::Tcp)
                },
            ]
        );
        assert_eq!(
            encode_open_ports(&decoded.rules),
            "22,tcp,,,,,,#;80,tcp,,eth0,,,,#"
        );
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let decoded = decode_open_ports("22,tcp,,,,,,#;abc,tcp,,,,,,#;443,udp,,,,,,#", V4);
        assert_eq!(decoded.rules.len(), 2);
        assert_eq!(decoded.skipped.len(), 1);
        assert!(matches!(decoded.skipped[0], NetError::FirewallRule { .. }));
    }

    #[test]
    fn too_many_fields_are_rejected() {
        let decoded = decode_open_ports("22,tcp,,,,,,,extra,#", V4);
        assert!(decoded.rules.is_empty());
        assert_eq!(decoded.skipped.len(), 1);
    }

    #[test]
    fn permitted_and_unpermitted_interface_conflict() {
        assert!(decode_open_port("22,tcp,,eth0,eth1,,,#", V4).is_err());
        let rule = decode_open_port("22,tcp,,,eth1,,,#", V4).unwrap();
        assert_eq!(rule.interface, InterfaceRestriction::Unpermitted("eth1".into()));
    }

    #[test]
    fn port_range_and_network_are_parsed() {
        let rule = decode_open_port("1000:2000,udp,10.0.0.0/8,,,00:11:22:33:44:55,53:53,#", V4)
            .unwrap();
        assert_eq!(rule.port, PortSpec::Range { start: 1000, end: 2000 });
        assert_eq!(rule.permitted_network, Some("10.0.0.0/8".parse().unwrap()));
        assert_eq!(rule.permitted_mac.as_deref(), Some("00:11:22:33:44:55"));
        assert_eq!(rule.source_port_range, Some(PortSpec::Range { start: 53, end: 53 }));
    }

    #[test]
    fn any_network_literal_normalises_to_none() {
        let v4 = decode_open_port("22,tcp,0.0.0.0/0,,,,,#", V4).unwrap();
        assert_eq!(v4.permitted_network, None);
        let v6 = decode_open_port("22,tcp,::/0,,,,,#", AddressFamily::Ipv6).unwrap();
        assert_eq!(v6.permitted_network, None);
    }

    #[test]
    fn network_of_the_wrong_family_is_rejected() {
        assert!(decode_open_port("22,tcp,fd00::/8,,,,,#", V4).is_err());
        assert!(decode_port_forward("eth0,eth1,10.0.0.5,tcp,80,8080,false,,,,#", AddressFamily::Ipv6).is_err());
    }

    #[test]
    fn bad_mac_and_protocol_are_rejected() {
        assert!(decode_open_port("22,tcp,,,,zz:zz,,#", V4).is_err());
        assert!(decode_open_port("22,icmp,,,,,,#", V4).is_err());
    }

    #[test]
    fn port_forward_round_trip() {
        let raw = "eth0,eth1,172.16.0.10,tcp,8080,80,true,192.168.0.0/16,,1024:65535,#";
        let decoded = decode_port_forwards(raw, V4);
        assert_eq!(decoded.rules.len(), 1);
        let rule = &decoded.rules[0];
        assert_eq!(rule.inbound_port, 8080);
        assert_eq!(rule.outbound_port, 80);
        assert!(rule.masquerade);
        assert_eq!(encode_port_forwards(&decoded.rules), raw);
    }

    #[test]
    fn nat_round_trip_uses_commas() {
        let raw = "eth1,eth0,all,172.16.0.0/24,,true,#;wlan0,eth0,tcp,,,false,#";
        let decoded = decode_nat(raw);
        assert_eq!(decoded.rules.len(), 2);
        assert_eq!(decoded.rules[0].source, Some("172.16.0.0/24".parse().unwrap()));
        assert_eq!(decoded.rules[1].protocol, Protocol::Tcp);
        assert_eq!(encode_nat(&decoded.rules), raw);
    }

    #[test]
    fn missing_final_terminator_is_tolerated() {
        let decoded = decode_open_ports("22,tcp", V4);
        assert_eq!(decoded.rules.len(), 1);
        assert_eq!(encode_open_ports(&decoded.rules), "22,tcp,,,,,,#");
    }

    #[test]
    fn empty_list_encodes_empty() {
        assert_eq!(encode_open_ports(&[]), "");
        assert!(decode_nat("").rules.is_empty());
    }
}
