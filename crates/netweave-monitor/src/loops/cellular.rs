// ── Cellular reconciliation ──
//
// `CellularLoop` tracks modems as they arrive and leave. Every tracked
// modem gets its own `CellularModemTask` that keeps the PPP session of a
// WAN modem connected and hard-resets a modem stuck without a session
// for longer than its reset timeout.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netweave_core::{
    needs_reconfiguration, InterfaceConfig, InterfaceKind, InterfaceState, LinkSemantics,
    ModemConfig, NetInterfaceStatus, NetworkConfiguration, PppState,
};

use super::{observe_link, LoopHandle, LoopSettings, Reconciler};
use crate::bus::{NetworkEvent, NotificationBus};
use crate::error::{MonitorError, OsError};
use crate::guard::InterfaceGuard;
use crate::os::{CellularModem, ModemDevice, ModemDriverFactory, NetworkAdmin};
use crate::registry::{self, SupportedModem};

/// Modem devices declared by the configuration (interfaces with USB
/// identity).
pub fn configured_modems(config: &NetworkConfiguration) -> Vec<ModemDevice> {
    config
        .interfaces_of(InterfaceKind::Modem)
        .filter_map(|iface| {
            iface.usb.as_ref().map(|usb| ModemDevice {
                interface_name: iface.name.clone(),
                usb: usb.clone(),
            })
        })
        .collect()
}

/// Live drivers keyed by USB port.
#[derive(Clone, Default)]
pub struct ModemBoard {
    modems: Arc<DashMap<String, Arc<dyn CellularModem>>>,
}

impl ModemBoard {
    pub fn get(&self, usb_port: &str) -> Option<Arc<dyn CellularModem>> {
        self.modems.get(usb_port).map(|m| Arc::clone(m.value()))
    }

    pub fn ports(&self) -> Vec<String> {
        let mut ports: Vec<_> = self.modems.iter().map(|m| m.key().clone()).collect();
        ports.sort();
        ports
    }

    pub fn len(&self) -> usize {
        self.modems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modems.is_empty()
    }
}

struct TrackedModem {
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

/// Everything a modem task shares with the loop that spawned it.
#[derive(Clone)]
struct Shared {
    admin: Arc<dyn NetworkAdmin>,
    bus: NotificationBus,
    guard: InterfaceGuard,
    handle: LoopHandle,
    rssi: Arc<watch::Sender<i32>>,
}

// ── CellularLoop ─────────────────────────────────────────────────────

pub struct CellularLoop {
    shared: Shared,
    factory: Arc<dyn ModemDriverFactory>,
    board: ModemBoard,
    tracked: HashMap<String, TrackedModem>,
    arrivals: Vec<ModemDevice>,
    departures: Vec<String>,
    settings: LoopSettings,
    cancel: CancellationToken,
}

impl CellularLoop {
    pub fn new(
        admin: Arc<dyn NetworkAdmin>,
        factory: Arc<dyn ModemDriverFactory>,
        bus: NotificationBus,
        guard: InterfaceGuard,
        initial: Arc<NetworkConfiguration>,
    ) -> Self {
        let (rssi, _) = watch::channel(0);
        let arrivals = configured_modems(&initial);
        Self {
            shared: Shared {
                admin,
                bus,
                guard,
                handle: LoopHandle::new(initial),
                rssi: Arc::new(rssi),
            },
            factory,
            board: ModemBoard::default(),
            tracked: HashMap::new(),
            arrivals,
            departures: Vec::new(),
            settings: LoopSettings::every(std::time::Duration::from_secs(30)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.shared.handle.clone()
    }

    pub fn modems(&self) -> ModemBoard {
        self.board.clone()
    }

    /// Signal strength of the most recently polled modem.
    pub fn rssi(&self) -> watch::Receiver<i32> {
        self.shared.rssi.subscribe()
    }

    /// Modem tasks run with the same period, under a child of `cancel`.
    pub fn start(mut self, settings: LoopSettings, cancel: CancellationToken) -> JoinHandle<()> {
        self.settings = settings;
        self.cancel = cancel.clone();
        let bus = self.shared.bus.clone();
        super::spawn(self, &bus, settings, cancel)
    }

    async fn track(&mut self, device: &ModemDevice) -> Result<(), MonitorError> {
        let usb_port = device.usb_port();
        let model = registry::lookup_usb(&device.usb).ok_or_else(|| {
            MonitorError::UnsupportedModem {
                vendor_id: device.usb.vendor_id.clone(),
                product_id: device.usb.product_id.clone(),
            }
        })?;
        let modem = self.factory.create(model, device).await?;
        info!(usb_port = %usb_port, vendor = model.vendor, model = model.model, "tracking modem");

        match read_identity(&*modem).await {
            Ok((imei, imsi, iccid)) => self.shared.bus.publish(NetworkEvent::ModemReady {
                usb_port: usb_port.clone(),
                imei,
                imsi,
                iccid,
            }),
            Err(e) => warn!(usb_port = %usb_port, error = %e, "failed to read modem identity"),
        }

        let config = self.shared.handle.configuration();
        let mut task = CellularModemTask::new(
            self.shared.clone(),
            model,
            device.clone(),
            Arc::clone(&modem),
            config.interface(&device.interface_name).cloned(),
        );
        task.prepare().await;

        let cancel = self.cancel.child_token();
        let join = super::spawn(task, &self.shared.bus, self.settings, cancel.clone());
        self.board.modems.insert(usb_port.clone(), modem);
        self.tracked.insert(
            usb_port,
            TrackedModem {
                cancel,
                _task: join,
            },
        );
        Ok(())
    }

    fn untrack(&mut self, usb_port: &str) {
        self.board.modems.remove(usb_port);
        if let Some(tracked) = self.tracked.remove(usb_port) {
            info!(usb_port = %usb_port, "modem removed");
            tracked.cancel.cancel();
        }
    }
}

async fn read_identity(modem: &dyn CellularModem) -> Result<(String, String, String), OsError> {
    Ok((
        modem.serial_number().await?,
        modem.imsi().await?,
        modem.iccid().await?,
    ))
}

#[async_trait]
impl Reconciler for CellularLoop {
    const NAME: &'static str = "cellular";

    fn accept(&mut self, event: &NetworkEvent) -> bool {
        match event {
            NetworkEvent::ConfigurationChanged { configuration, .. } => {
                // Modem tasks see the event themselves; keep a copy for
                // modems tracked later.
                self.shared.handle.adopt(Arc::clone(configuration));
                false
            }
            NetworkEvent::ModemAdded(device) => {
                self.arrivals.push(device.clone());
                true
            }
            NetworkEvent::ModemRemoved { usb_port } => {
                self.departures.push(usb_port.clone());
                true
            }
            _ => false,
        }
    }

    async fn tick(&mut self) {
        for usb_port in std::mem::take(&mut self.departures) {
            self.untrack(&usb_port);
            self.arrivals.retain(|d| d.usb_port() != usb_port);
        }

        let mut retry = Vec::new();
        for device in std::mem::take(&mut self.arrivals) {
            if self.tracked.contains_key(&device.usb_port()) {
                continue;
            }
            match self.track(&device).await {
                Ok(()) => {}
                Err(e @ MonitorError::UnsupportedModem { .. }) => {
                    warn!(usb_port = %device.usb_port(), error = %e, "ignoring modem");
                }
                Err(e) => {
                    warn!(usb_port = %device.usb_port(), error = %e, "failed to track modem, will retry");
                    retry.push(device);
                }
            }
        }
        self.arrivals = retry;
    }
}

// ── CellularModemTask ────────────────────────────────────────────────

pub struct CellularModemTask {
    shared: Shared,
    model: &'static SupportedModem,
    device: ModemDevice,
    modem: Arc<dyn CellularModem>,
    interface: Option<InterfaceConfig>,
    pending: Option<Arc<NetworkConfiguration>>,
    /// Started when the modem goes looking for a session; cleared once
    /// connected.
    reset_timer: Option<Instant>,
    diversity: Option<bool>,
}

impl CellularModemTask {
    fn new(
        shared: Shared,
        model: &'static SupportedModem,
        device: ModemDevice,
        modem: Arc<dyn CellularModem>,
        interface: Option<InterfaceConfig>,
    ) -> Self {
        Self {
            shared,
            model,
            device,
            modem,
            interface,
            pending: None,
            reset_timer: None,
            diversity: None,
        }
    }

    fn modem_config(&self) -> Option<&ModemConfig> {
        self.interface.as_ref().and_then(InterfaceConfig::modem_config)
    }

    fn is_wan(&self) -> bool {
        self.interface
            .as_ref()
            .is_some_and(|i| i.status() == NetInterfaceStatus::EnabledWan)
    }

    /// One-off setup after the driver is created.
    async fn prepare(&mut self) {
        if let Err(e) = self.provision_if_needed().await {
            warn!(usb_port = %self.device.usb_port(), error = %e, "provisioning failed");
        }
        if let Err(e) = self.reconcile_gps().await {
            warn!(usb_port = %self.device.usb_port(), error = %e, "GPS setup failed");
        }
    }

    async fn provision_if_needed(&self) -> Result<(), OsError> {
        if !self.model.capabilities.provisioning || !self.is_wan() {
            return Ok(());
        }
        if self.modem.is_provisioned().await? {
            debug!(model = self.model.model, "modem is provisioned");
            return Ok(());
        }
        info!(model = self.model.model, "modem is not provisioned, provisioning");
        self.modem.provision().await
    }

    async fn reconcile_gps(&self) -> Result<(), OsError> {
        if !self.model.capabilities.gps {
            return Ok(());
        }
        let wanted = self.modem_config().is_some_and(|c| c.gps_enabled);
        let enabled = self.modem.is_gps_enabled().await?;
        if wanted && !enabled {
            debug!(model = self.model.model, "enabling GPS");
            self.modem.enable_gps().await?;
        } else if !wanted && enabled {
            debug!(model = self.model.model, "disabling GPS");
            self.modem.disable_gps().await?;
        }
        Ok(())
    }

    async fn reconcile_diversity(&mut self, wanted: bool) -> Result<(), OsError> {
        if !self.model.capabilities.diversity || self.diversity == Some(wanted) {
            return Ok(());
        }
        debug!(model = self.model.model, enabled = wanted, "setting antenna diversity");
        self.modem.set_diversity(wanted).await?;
        self.diversity = Some(wanted);
        Ok(())
    }

    /// Adopt the modem's interface from `new`. Fails, leaving the current
    /// interface in place, when the running session cannot be torn down.
    async fn apply_configuration(&mut self, new: &NetworkConfiguration) -> Result<(), OsError> {
        let next = new.interface(&self.device.interface_name).cloned();
        if !needs_reconfiguration(self.interface.as_ref(), next.as_ref()) {
            self.interface = next;
            return Ok(());
        }

        info!(interface = %self.device.interface_name, "new modem configuration");
        if matches!(
            self.modem.ppp_state().await?,
            PppState::Connected | PppState::InProgress
        ) {
            self.modem.disconnect().await?;
        }
        if let Some(old) = self.modem_config().map(ModemConfig::ppp_interface) {
            self.shared.handle.forget(&old);
        }
        self.reset_timer = None;
        self.diversity = None;
        self.interface = next;

        if let Err(e) = self.reconcile_gps().await {
            warn!(usb_port = %self.device.usb_port(), error = %e, "GPS setup failed");
        }
        if let Err(e) = self.provision_if_needed().await {
            warn!(usb_port = %self.device.usb_port(), error = %e, "provisioning failed");
        }
        Ok(())
    }

    fn reset_due(&self, config: &ModemConfig) -> bool {
        match (self.reset_timer, config.reset_timeout_duration()) {
            (Some(started), Some(timeout)) => started.elapsed() > timeout,
            _ => false,
        }
    }

    async fn reset(&mut self) -> Result<(), OsError> {
        warn!(usb_port = %self.device.usb_port(), "modem reset timeout, resetting");
        self.modem.disconnect().await?;
        if self.model.capabilities.gps && self.modem.is_gps_enabled().await? {
            self.modem.disable_gps().await?;
        }
        self.modem.reset().await?;
        self.reset_timer = Some(Instant::now());
        self.diversity = None;
        Ok(())
    }

    async fn publish_rssi(&self) {
        let rssi = self.modem.signal_strength().await.unwrap_or_else(|e| {
            debug!(usb_port = %self.device.usb_port(), error = %e, "failed to read signal strength");
            0
        });
        self.shared.rssi.send_replace(rssi);
    }

    async fn step(&mut self, config: &ModemConfig) -> Result<(), OsError> {
        let ppp_name = config.ppp_interface();
        let ppp = self.modem.ppp_state().await?;
        debug!(interface = %ppp_name, %ppp, "PPP state");

        let mut was_reset = false;
        match ppp {
            PppState::Connected => {
                if self.reset_timer.take().is_some() {
                    info!(interface = %ppp_name, "PPP session established");
                }
            }
            PppState::NotConnected | PppState::InProgress => {
                if self.reset_due(config) {
                    self.reset().await?;
                    was_reset = true;
                } else {
                    if ppp == PppState::NotConnected {
                        if self.model.capabilities.sim_check
                            && !self.modem.is_sim_card_ready().await?
                        {
                            warn!(interface = %ppp_name, "SIM card not ready");
                        } else {
                            info!(interface = %ppp_name, apn = %config.apn, "connecting");
                            self.modem.connect(config).await?;
                        }
                    }
                    self.reset_timer.get_or_insert_with(Instant::now);
                }
            }
        }

        if !was_reset {
            self.reconcile_gps().await?;
            self.reconcile_diversity(config.diversity_enabled).await?;
        }

        let ppp = self.modem.ppp_state().await?;
        if let Some(iface) = self.interface.as_ref() {
            let link = observe_link(
                &*self.shared.admin,
                &ppp_name,
                iface,
                LinkSemantics::Cellular { ppp },
            )
            .await?;
            let state = InterfaceState::observe(&ppp_name, &link);
            self.shared.handle.record(&self.shared.bus, state, false);
        }
        Ok(())
    }
}

#[async_trait]
impl Reconciler for CellularModemTask {
    const NAME: &'static str = "cellular-modem";

    fn accept(&mut self, event: &NetworkEvent) -> bool {
        match event {
            NetworkEvent::ConfigurationChanged { configuration, .. } => {
                self.pending = Some(Arc::clone(configuration));
                true
            }
            _ => false,
        }
    }

    async fn tick(&mut self) {
        if let Some(new) = self.pending.take() {
            if let Err(e) = self.apply_configuration(&new).await {
                warn!(
                    usb_port = %self.device.usb_port(),
                    error = %e,
                    "modem reconfiguration failed, will retry"
                );
                self.pending = Some(new);
            }
        }

        self.publish_rssi().await;
        if let Some(Err(reason)) = self.interface.as_ref().map(InterfaceConfig::validate) {
            warn!(interface = %self.device.interface_name, %reason, "skipping invalid interface");
            return;
        }
        if !self.is_wan() {
            return;
        }
        let Some(config) = self.modem_config().cloned() else {
            return;
        };

        let _lock = self.shared.guard.lock(&config.ppp_interface()).await;
        if let Err(e) = self.step(&config).await {
            warn!(usb_port = %self.device.usb_port(), error = %e, "modem reconcile failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use netweave_core::UsbDevice;

    #[test]
    fn configured_modems_need_usb_identity() {
        let mut config = NetworkConfiguration::new();
        let mut with_usb = InterfaceConfig::new("1-1.4", InterfaceKind::Modem);
        with_usb.usb = Some(UsbDevice {
            vendor_id: "1bc7".into(),
            product_id: "0021".into(),
            bus_number: "1".into(),
            device_path: "1.4".into(),
            ..UsbDevice::default()
        });
        config.add_interface(with_usb);
        config.add_interface(InterfaceConfig::new("serial0", InterfaceKind::Modem));
        config.add_interface(InterfaceConfig::new("eth0", InterfaceKind::Ethernet));

        let devices = configured_modems(&config);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].usb_port(), "1-1.4");
        assert_eq!(devices[0].interface_name, "1-1.4");
    }
}
