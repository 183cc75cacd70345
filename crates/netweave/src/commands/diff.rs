use serde::Serialize;
use tabled::Tabled;

use netweave_core::diff::reconfiguration_reason;
use netweave_core::{InterfaceKind, changed_interfaces};

use super::Context;
use crate::cli::{DiffArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Change {
    interface: String,
    kind: Option<InterfaceKind>,
    reason: String,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub fn handle(args: &DiffArgs, ctx: &Context) -> Result<(), CliError> {
    let old = super::interpret(&args.old)?;
    let new = super::interpret(&args.new)?;
    super::ensure_none_rejected(&new)?;
    let (old, new) = (old.configuration, new.configuration);

    let changes: Vec<Change> = changed_interfaces(&old, &new, |_| true)
        .into_iter()
        .filter_map(|name| {
            let before = old.interface(&name);
            let after = new.interface(&name);
            let reason = reconfiguration_reason(before, after)?;
            Some(Change {
                kind: after.or(before).map(|i| i.kind),
                interface: name,
                reason: reason.to_string(),
            })
        })
        .collect();

    if changes.is_empty() && matches!(ctx.output, OutputFormat::Table) {
        output::print_output("No interface needs reconfiguration", ctx.quiet);
        return Ok(());
    }

    let out = output::render_list(
        ctx.output,
        &changes,
        |c| ChangeRow {
            interface: c.interface.clone(),
            kind: c.kind.map_or_else(|| "-".into(), |k| k.to_string()),
            reason: c.reason.clone(),
        },
        |c| c.interface.clone(),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
