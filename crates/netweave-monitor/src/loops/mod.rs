// ── Reconciliation loop plumbing ──
//
// Every loop is a `Reconciler` driven by `drive`: it wakes on its period
// or on an accepted bus event, runs one tick, and exits when cancelled.
// A tick never fails; collaborator errors are logged per interface and
// retried on the next tick.

pub mod cellular;
pub mod dns;
pub mod ethernet;
pub mod wifi;

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netweave_core::{
    InterfaceConfig, InterfaceState, LinkSemantics, NetworkConfiguration, ObservedLink,
};

use crate::bus::{NetworkEvent, NotificationBus};
use crate::error::OsError;
use crate::os::NetworkAdmin;

pub use cellular::{CellularLoop, CellularModemTask};
pub use dns::DnsLoop;
pub use ethernet::EthernetLoop;
pub use wifi::WifiLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub period: Duration,
}

impl LoopSettings {
    pub const fn every(period: Duration) -> Self {
        Self { period }
    }
}

// ── Reconciler ───────────────────────────────────────────────────────

#[async_trait]
pub trait Reconciler: Send + 'static {
    /// Short name used in logs.
    const NAME: &'static str;

    /// Inspect a bus event. Returning `true` runs a tick right away.
    fn accept(&mut self, event: &NetworkEvent) -> bool;

    async fn tick(&mut self);
}

/// Run `reconciler` until `cancel` fires.
///
/// The first tick runs immediately. An accepted event runs a tick and
/// restarts the period.
pub async fn drive<R: Reconciler>(
    mut reconciler: R,
    mut events: broadcast::Receiver<NetworkEvent>,
    settings: LoopSettings,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(settings.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        reconciler = R::NAME,
        period_secs = settings.period.as_secs(),
        "reconciliation loop started"
    );

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if !reconciler.accept(&event) {
                        continue;
                    }
                    debug!(reconciler = R::NAME, event = event.label(), "woken by event");
                    interval.reset();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(reconciler = R::NAME, skipped, "notification bus lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            _ = interval.tick() => {}
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = reconciler.tick() => {}
        }
    }

    info!(reconciler = R::NAME, "reconciliation loop stopped");
}

/// Spawn `reconciler` on the runtime with its own bus receiver.
pub fn spawn<R: Reconciler>(
    reconciler: R,
    bus: &NotificationBus,
    settings: LoopSettings,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(drive(reconciler, bus.subscribe(), settings, cancel))
}

// ── LoopHandle ───────────────────────────────────────────────────────

/// Shared view of a loop: the configuration it has adopted and the last
/// state it observed per interface.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    configuration: Arc<ArcSwap<NetworkConfiguration>>,
    statuses: Arc<DashMap<String, InterfaceState>>,
}

impl LoopHandle {
    pub fn new(initial: Arc<NetworkConfiguration>) -> Self {
        Self {
            configuration: Arc::new(ArcSwap::new(initial)),
            statuses: Arc::new(DashMap::new()),
        }
    }

    pub fn configuration(&self) -> Arc<NetworkConfiguration> {
        self.configuration.load_full()
    }

    pub fn status(&self, name: &str) -> Option<InterfaceState> {
        self.statuses.get(name).map(|s| s.value().clone())
    }

    /// Every recorded state, sorted by interface name.
    pub fn statuses(&self) -> Vec<InterfaceState> {
        let mut all: Vec<_> = self.statuses.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub(crate) fn adopt(&self, configuration: Arc<NetworkConfiguration>) {
        self.configuration.store(configuration);
    }

    pub(crate) fn forget(&self, name: &str) {
        self.statuses.remove(name);
    }

    /// Store `state` and publish it when it differs from the previous one,
    /// or unconditionally when `force` is set. Returns whether it was posted.
    pub(crate) fn record(&self, bus: &NotificationBus, state: InterfaceState, force: bool) -> bool {
        let changed = self
            .statuses
            .get(&state.name)
            .is_none_or(|previous| *previous != state);
        if !(changed || force) {
            return false;
        }
        debug!(interface = %state.name, state = %state, "interface status changed");
        self.statuses.insert(state.name.clone(), state.clone());
        bus.publish(NetworkEvent::StatusChanged(Arc::new(state)));
        true
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

/// Gather the administrative facts of `iface` under `semantics`.
pub(crate) async fn observe_link(
    admin: &dyn NetworkAdmin,
    name: &str,
    iface: &InterfaceConfig,
    semantics: LinkSemantics,
) -> Result<ObservedLink, OsError> {
    let mut link = ObservedLink::new(semantics, iface.status());
    link.is_up = admin.is_up(name).await?;
    link.has_address = admin.has_address(name).await?;
    link.carrier = admin.is_link_up(iface.kind, name).await?;
    link.carrier_changes = admin.carrier_changes(name).await?;
    link.address = admin.current_address(name).await?;
    Ok(link)
}
