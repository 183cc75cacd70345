use serde::Serialize;
use tabled::Tabled;

use netweave_core::{InterfaceConfig, InterfaceKind, NetInterfaceStatus, WifiMode};

use super::Context;
use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output;

/// One interpreted (or rejected) interface.
#[derive(Debug, Serialize)]
struct InterfaceSummary {
    name: String,
    kind: Option<InterfaceKind>,
    status: NetInterfaceStatus,
    dhcp: bool,
    address: Option<String>,
    detail: String,
    error: Option<String>,
}

impl InterfaceSummary {
    fn from_config(iface: &InterfaceConfig) -> Self {
        let ip4 = iface.ip4();
        Self {
            name: iface.name.clone(),
            kind: Some(iface.kind),
            status: iface.status(),
            dhcp: iface.is_dhcp_client(),
            address: ip4.and_then(|ip| ip.address.map(|a| format!("{a}/{}", ip.prefix))),
            detail: detail(iface),
            error: iface.validate().err(),
        }
    }
}

fn detail(iface: &InterfaceConfig) -> String {
    let mut parts = Vec::new();
    if let Some(wifi) = iface.active_wifi_config() {
        parts.push(format!("{} ssid={}", wifi.mode, wifi.ssid));
    } else if iface.wifi_mode() != WifiMode::Unknown {
        parts.push(format!("{} (no fragment)", iface.wifi_mode()));
    }
    if let Some(modem) = iface.modem_config() {
        parts.push(format!("{} apn={}", modem.ppp_interface(), modem.apn));
    }
    if let Some(usb) = &iface.usb {
        parts.push(format!("usb {}", usb.usb_port()));
    }
    if let Some(server) = iface.dhcp_server4().filter(|s| s.enabled) {
        parts.push(format!(
            "dhcpd {}-{}{}",
            server.range_start,
            server.range_end,
            if server.pass_dns { " +dns" } else { "" }
        ));
    }
    parts.join(", ")
}

#[derive(Tabled)]
struct InterfaceRow {
    #[tabled(rename = "Interface")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "DHCP")]
    dhcp: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn to_row(summary: &InterfaceSummary, color: bool) -> InterfaceRow {
    let detail = match &summary.error {
        Some(error) => output::paint_warning(error, color),
        None => summary.detail.clone(),
    };
    InterfaceRow {
        name: summary.name.clone(),
        kind: summary.kind.map_or_else(|| "-".into(), |k| k.to_string()),
        status: output::paint_status(summary.status, color),
        dhcp: if summary.dhcp { "client".into() } else { "-".into() },
        address: summary.address.clone().unwrap_or_else(|| "-".into()),
        detail,
    }
}

pub fn handle(args: CheckArgs, ctx: &Context) -> Result<(), CliError> {
    let path = ctx.properties_path(args.properties);
    let parsed = super::interpret(&path)?;

    let mut summaries: Vec<InterfaceSummary> = parsed
        .configuration
        .interfaces()
        .map(InterfaceSummary::from_config)
        .collect();
    summaries.extend(parsed.rejected.iter().map(|r| InterfaceSummary {
        name: r.name.clone(),
        kind: None,
        status: NetInterfaceStatus::Unknown,
        dhcp: false,
        address: None,
        detail: String::new(),
        error: Some(r.error.to_string()),
    }));

    let out = output::render_list(
        ctx.output,
        &summaries,
        |s| to_row(s, ctx.color),
        |s| s.name.clone(),
    )?;
    output::print_output(&out, ctx.quiet);

    super::ensure_none_rejected(&parsed)?;
    parsed.configuration.validate()?;
    Ok(())
}
