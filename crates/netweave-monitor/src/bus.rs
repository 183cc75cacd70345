// ── Notification bus ──
//
// Broadcast fan-out of network events. Every loop holds a receiver and
// wakes on relevant events instead of waiting for its next period.

use std::sync::Arc;

use netweave_core::{InterfaceState, NetworkConfiguration, Properties};
use tokio::sync::broadcast;

use crate::os::ModemDevice;

const BUS_CAPACITY: usize = 256;

/// Events exchanged between the supervisor and the loops.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// A new desired configuration was accepted.
    ConfigurationChanged {
        properties: Arc<Properties>,
        configuration: Arc<NetworkConfiguration>,
    },
    /// A loop observed a different state for one interface.
    StatusChanged(Arc<InterfaceState>),
    ModemAdded(ModemDevice),
    ModemRemoved { usb_port: String },
    /// A modem was tracked and its identity read.
    ModemReady {
        usb_port: String,
        imei: String,
        imsi: String,
        iccid: String,
    },
}

impl NetworkEvent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConfigurationChanged { .. } => "configuration-changed",
            Self::StatusChanged(_) => "status-changed",
            Self::ModemAdded(_) => "modem-added",
            Self::ModemRemoved { .. } => "modem-removed",
            Self::ModemReady { .. } => "modem-ready",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<NetworkEvent>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Post an event. Having no subscribers is not an error.
    pub fn publish(&self, event: NetworkEvent) {
        let label = event.label();
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::trace!(event = label, receivers, "published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.tx.subscribe()
    }
}
