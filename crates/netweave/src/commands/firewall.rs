use serde::Serialize;
use tabled::Tabled;

use netweave_core::interpret::firewall::{self, FirewallReport};
use netweave_core::model::firewall::InterfaceRestriction;
use netweave_core::{AddressFamily, NatRule, OpenPortRule, PortForwardRule};

use super::Context;
use crate::cli::{Family, FirewallArgs};
use crate::error::CliError;
use crate::output;

/// One decoded rule, flattened for display.
#[derive(Debug, Serialize)]
struct RuleSummary {
    family: AddressFamily,
    list: &'static str,
    protocol: String,
    ports: String,
    interfaces: String,
    network: String,
    target: String,
}

fn or_any<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "any".into(), ToString::to_string)
}

fn open_port(family: AddressFamily, rule: &OpenPortRule) -> RuleSummary {
    let interfaces = match &rule.interface {
        InterfaceRestriction::Any => "any".into(),
        InterfaceRestriction::Permitted(name) => name.clone(),
        InterfaceRestriction::Unpermitted(name) => format!("!{name}"),
    };
    RuleSummary {
        family,
        list: "open-port",
        protocol: rule.protocol.to_string(),
        ports: rule.port.to_string(),
        interfaces,
        network: or_any(rule.permitted_network.as_ref()),
        target: rule.permitted_mac.clone().unwrap_or_default(),
    }
}

fn port_forward(family: AddressFamily, rule: &PortForwardRule) -> RuleSummary {
    RuleSummary {
        family,
        list: "port-forward",
        protocol: rule.protocol.to_string(),
        ports: format!("{} -> {}", rule.inbound_port, rule.outbound_port),
        interfaces: format!("{} -> {}", rule.inbound_interface, rule.outbound_interface),
        network: or_any(rule.permitted_network.as_ref()),
        target: if rule.masquerade {
            format!("{} (masquerade)", rule.address)
        } else {
            rule.address.to_string()
        },
    }
}

fn nat(family: AddressFamily, rule: &NatRule) -> RuleSummary {
    RuleSummary {
        family,
        list: "nat",
        protocol: rule.protocol.to_string(),
        ports: "-".into(),
        interfaces: format!("{} -> {}", rule.source_interface, rule.destination_interface),
        network: format!(
            "{} -> {}",
            or_any(rule.source.as_ref()),
            or_any(rule.destination.as_ref())
        ),
        target: if rule.masquerade { "masquerade".into() } else { String::new() },
    }
}

fn summarize(report: &FirewallReport) -> impl Iterator<Item = RuleSummary> + '_ {
    let config = &report.configuration;
    let family = config.family;
    config
        .open_ports
        .iter()
        .map(move |r| open_port(family, r))
        .chain(config.port_forwards.iter().map(move |r| port_forward(family, r)))
        .chain(config.nat.iter().map(move |r| nat(family, r)))
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "List")]
    list: String,
    #[tabled(rename = "Proto")]
    protocol: String,
    #[tabled(rename = "Ports")]
    ports: String,
    #[tabled(rename = "Interfaces")]
    interfaces: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Target")]
    target: String,
}

impl From<&RuleSummary> for RuleRow {
    fn from(r: &RuleSummary) -> Self {
        Self {
            family: r.family.to_string(),
            list: r.list.into(),
            protocol: r.protocol.clone(),
            ports: r.ports.clone(),
            interfaces: r.interfaces.clone(),
            network: r.network.clone(),
            target: r.target.clone(),
        }
    }
}

pub fn handle(args: FirewallArgs, ctx: &Context) -> Result<(), CliError> {
    let path = ctx.properties_path(args.properties);
    let props = super::load_properties(&path)?;

    let families: &[AddressFamily] = match args.family {
        Some(Family::Ipv4) => &[AddressFamily::Ipv4],
        Some(Family::Ipv6) => &[AddressFamily::Ipv6],
        None => &[AddressFamily::Ipv4, AddressFamily::Ipv6],
    };

    let mut rules = Vec::new();
    for &family in families {
        let report = firewall::parse_report(&props, family);
        for skipped in &report.skipped {
            tracing::warn!(%family, error = %skipped, "firewall record skipped");
            if !ctx.quiet {
                eprintln!("{}", output::paint_warning(&format!("skipped: {skipped}"), ctx.color));
            }
        }
        rules.extend(summarize(&report));
    }

    let out = output::render_list(
        ctx.output,
        &rules,
        |r| RuleRow::from(r),
        |r| format!("{} {} {}", r.list, r.protocol, r.ports),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
