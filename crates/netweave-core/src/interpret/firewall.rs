// ── Firewall interpreter ──

use crate::codec;
use crate::error::NetError;
use crate::model::{AddressFamily, FirewallConfiguration};
use crate::properties::Properties;

pub const OPEN_PORTS: &str = "open.ports";
pub const PORT_FORWARDING: &str = "port.forwarding";
pub const NAT: &str = "nat";

/// `firewall.<list>` or `firewall.ipv6.<list>`.
pub fn key(family: AddressFamily, list: &str) -> String {
    format!("{}{list}", family.key_prefix())
}

/// Rules for one family plus every record that failed to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirewallReport {
    pub configuration: FirewallConfiguration,
    pub skipped: Vec<NetError>,
}

pub fn parse(props: &Properties, family: AddressFamily) -> FirewallConfiguration {
    parse_report(props, family).configuration
}

pub fn parse_report(props: &Properties, family: AddressFamily) -> FirewallReport {
    let text = |list: &str| props.raw_text(&key(family, list)).unwrap_or_default();

    let open = codec::decode_open_ports(&text(OPEN_PORTS), family);
    let forwards = codec::decode_port_forwards(&text(PORT_FORWARDING), family);
    let nat = codec::decode_nat(&text(NAT));

    let mut skipped = open.skipped;
    skipped.extend(forwards.skipped);
    skipped.extend(nat.skipped);

    FirewallReport {
        configuration: FirewallConfiguration {
            family,
            open_ports: open.rules,
            port_forwards: forwards.rules,
            nat: nat.rules,
        },
        skipped,
    }
}

/// Both families, IPv4 first.
pub fn parse_all(props: &Properties) -> [FirewallConfiguration; 2] {
    [
        parse(props, AddressFamily::Ipv4),
        parse(props, AddressFamily::Ipv6),
    ]
}

pub fn serialize(config: &FirewallConfiguration, props: &mut Properties) {
    let family = config.family;
    props.insert(key(family, OPEN_PORTS), codec::encode_open_ports(&config.open_ports));
    props.insert(
        key(family, PORT_FORWARDING),
        codec::encode_port_forwards(&config.port_forwards),
    );
    props.insert(key(family, NAT), codec::encode_nat(&config.nat));
}
