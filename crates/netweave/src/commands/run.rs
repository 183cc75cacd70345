use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use netweave_core::{InterfaceState, LinkPhase};
use netweave_monitor::{
    Collaborators, NetworkEvent, NetworkMonitor, SimulatedHost, SimulatedModemFactory,
};

use super::Context;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct StatusSummary {
    reconciler: &'static str,
    #[serde(flatten)]
    state: InterfaceState,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Loop")]
    reconciler: String,
    #[tabled(rename = "Interface")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "State")]
    phase: String,
    #[tabled(rename = "Address")]
    address: String,
}

fn to_row(s: &StatusSummary, color: bool) -> StatusRow {
    StatusRow {
        reconciler: s.reconciler.into(),
        name: s.state.name.clone(),
        kind: s.state.kind.to_string(),
        phase: output::paint_phase(s.state.phase(), color),
        address: s.state.address.map_or_else(|| "-".into(), |a| a.to_string()),
    }
}

/// Log every notification until cancelled.
async fn watch_events(mut events: broadcast::Receiver<NetworkEvent>, cancel: CancellationToken) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(NetworkEvent::StatusChanged(state)) => {
                tracing::info!(interface = %state.name, phase = %state.phase(), "status changed");
            }
            Ok(NetworkEvent::ModemReady { usb_port, imei, .. }) => {
                tracing::info!(%usb_port, %imei, "modem ready");
            }
            Ok(other) => tracing::debug!(event = other.label(), "notification"),
            Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

pub async fn handle(args: RunArgs, ctx: &Context) -> Result<(), CliError> {
    let path = ctx.properties_path(args.properties);
    let parsed = super::interpret(&path)?;
    let configuration = parsed.configuration;
    configuration.validate()?;

    let host = SimulatedHost::from_configuration(&configuration);
    let factory = SimulatedModemFactory::new();
    let mut monitor = NetworkMonitor::new(
        Collaborators::simulated(&host, &factory),
        ctx.daemon.monitor_settings(),
        configuration,
    );

    let watcher = tokio::spawn(watch_events(
        monitor.subscribe(),
        monitor.cancellation_token().child_token(),
    ));
    monitor.start();
    tracing::info!(path = %path.display(), "dry run started");

    match args.duration {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            if !ctx.quiet {
                eprintln!("Reconciling against a simulated host, press Ctrl-C to stop");
            }
            tokio::signal::ctrl_c().await?;
        }
    }

    let handles = monitor.handles().clone();
    monitor.stop().await?;
    let _ = watcher.await;

    let mut statuses: Vec<StatusSummary> = [
        ("ethernet", &handles.ethernet),
        ("wifi", &handles.wifi),
        ("cellular", &handles.cellular),
    ]
    .into_iter()
    .flat_map(|(reconciler, handle)| {
        handle
            .statuses()
            .into_iter()
            .map(move |state| StatusSummary { reconciler, state })
    })
    .collect();
    statuses.sort_by(|a, b| a.state.name.cmp(&b.state.name));

    let linked = statuses
        .iter()
        .filter(|s| s.state.phase() == LinkPhase::UpLinked)
        .count();
    tracing::info!(interfaces = statuses.len(), linked, "dry run finished");

    let out = output::render_list(
        ctx.output,
        &statuses,
        |s| to_row(s, ctx.color),
        |s| format!("{} {}", s.state.name, s.state.phase()),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
