// ── WiFi reconciliation ──
//
// Drives WiFi interfaces in access-point (MASTER) or station (INFRA)
// mode. A station is only brought up when its SSID is visible; an AP
// whose hostapd died is bounced. Enable failures power-cycle the radio.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use netweave_core::{
    changed_interfaces, InterfaceConfig, InterfaceKind, InterfaceState, LinkSemantics,
    NetInterfaceStatus, NetworkConfiguration, WifiMode,
};

use super::{observe_link, LoopHandle, LoopSettings, Reconciler};
use crate::bus::{NetworkEvent, NotificationBus};
use crate::error::OsError;
use crate::guard::InterfaceGuard;
use crate::os::{NetworkAdmin, RouteTable, WifiDriver};

const PING_ATTEMPTS: u32 = 3;
const PING_TIMEOUT: Duration = Duration::from_secs(1);
const PING_BACKOFF: Duration = Duration::from_secs(1);
const POWER_OFF_WAIT: Duration = Duration::from_secs(10);
const POWER_ON_WAIT: Duration = Duration::from_secs(20);
const POWER_POLL: Duration = Duration::from_secs(1);

/// Monitor interfaces (`mon0`) belong to packet capture, not to us.
fn is_monitored(iface: &InterfaceConfig) -> bool {
    iface.kind == InterfaceKind::Wifi && !iface.name.starts_with("mon")
}

/// LAN or WAN in an operational mode.
fn is_wifi_enabled(iface: &InterfaceConfig) -> bool {
    iface.is_enabled() && iface.wifi_mode().is_operational()
}

pub struct WifiLoop {
    admin: Arc<dyn NetworkAdmin>,
    routes: Arc<dyn RouteTable>,
    driver: Arc<dyn WifiDriver>,
    bus: NotificationBus,
    guard: InterfaceGuard,
    handle: LoopHandle,
    pending: Option<Arc<NetworkConfiguration>>,
    rssi: watch::Sender<i32>,
}

impl WifiLoop {
    pub fn new(
        admin: Arc<dyn NetworkAdmin>,
        routes: Arc<dyn RouteTable>,
        driver: Arc<dyn WifiDriver>,
        bus: NotificationBus,
        guard: InterfaceGuard,
        initial: Arc<NetworkConfiguration>,
    ) -> Self {
        let (rssi, _) = watch::channel(0);
        Self {
            admin,
            routes,
            driver,
            bus,
            guard,
            handle: LoopHandle::new(initial),
            pending: None,
            rssi,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Signal level of the station's access point, refreshed every tick.
    pub fn rssi(&self) -> watch::Receiver<i32> {
        self.rssi.subscribe()
    }

    pub fn start(self, settings: LoopSettings, cancel: CancellationToken) -> JoinHandle<()> {
        let bus = self.bus.clone();
        super::spawn(self, &bus, settings, cancel)
    }

    // ── Configuration change ─────────────────────────────────────────

    /// Same retry contract as the Ethernet loop: an interface whose
    /// teardown failed keeps its previous configuration and `new` stays
    /// queued.
    async fn apply_configuration(&mut self, new: Arc<NetworkConfiguration>) {
        let old = self.handle.configuration();
        let changed = changed_interfaces(&old, &new, is_monitored);

        let mut failed = Vec::new();
        for name in changed {
            info!(interface = %name, "new WiFi configuration");
            let _lock = self.guard.lock(&name).await;
            if let Err(e) = self.teardown(&name, &old, &new).await {
                warn!(interface = %name, error = %e, "failed to reconfigure, will retry");
                failed.push(name);
                continue;
            }
            if new.interface(&name).is_none() {
                self.handle.forget(&name);
            }
        }

        if failed.is_empty() {
            self.handle.adopt(new);
        } else {
            self.handle.adopt(Arc::new(new.with_interfaces_from(&old, &failed)));
            self.pending = Some(new);
        }
    }

    /// Disable `name` and reload the kernel module when the operational
    /// mode changed.
    async fn teardown(
        &self,
        name: &str,
        old: &NetworkConfiguration,
        new: &NetworkConfiguration,
    ) -> Result<(), OsError> {
        self.disable(name).await?;
        let old_mode = old.interface(name).map(InterfaceConfig::wifi_mode);
        let new_mode = new.interface(name).map(InterfaceConfig::wifi_mode);
        if let (Some(old_mode), Some(new_mode)) = (old_mode, new_mode) {
            if old_mode != new_mode && new_mode.is_operational() {
                self.reload_kernel_module(name, new_mode).await?;
            }
        }
        Ok(())
    }

    async fn reload_kernel_module(&self, name: &str, mode: WifiMode) -> Result<(), OsError> {
        info!(interface = %name, %mode, "reloading WiFi kernel module");
        self.driver.unload_kernel_module(name).await?;
        self.driver.load_kernel_module(name, mode).await
    }

    // ── Interface actions ────────────────────────────────────────────

    async fn disable(&self, name: &str) -> Result<(), OsError> {
        debug!(interface = %name, "disabling");
        self.admin.disable_interface(name).await?;
        self.admin.manage_dhcp_server(name, false).await
    }

    async fn enable(&self, iface: &InterfaceConfig) -> Result<(), OsError> {
        if !is_wifi_enabled(iface) {
            return Ok(());
        }
        debug!(interface = %iface.name, mode = %iface.wifi_mode(), "enabling");
        self.admin
            .enable_interface(&iface.name, iface.is_dhcp_client())
            .await?;
        if iface.dhcp_server4().is_some_and(|s| s.enabled) {
            self.admin.manage_dhcp_server(&iface.name, true).await?;
        }
        Ok(())
    }

    async fn observe(&self, iface: &InterfaceConfig) -> Result<InterfaceState, OsError> {
        let name = iface.name.as_str();
        let semantics = LinkSemantics::Wifi {
            mode: iface.wifi_mode(),
            access_point_running: self.driver.is_access_point_process_running(name).await?,
            station_running: self.driver.is_station_process_running(name).await?,
            kernel_mode: self.driver.kernel_mode(name).await?,
        };
        let link = observe_link(&*self.admin, name, iface, semantics).await?;
        Ok(InterfaceState::observe(name, &link))
    }

    async fn is_access_point_available(&self, name: &str, ssid: &str) -> Result<bool, OsError> {
        let seen = self.driver.scan(name).await?;
        Ok(seen.iter().any(|ap| {
            trace!(interface = %name, ssid = %ap.ssid, strength = ap.strength, "scan result");
            ap.ssid == ssid && ap.strength > 0
        }))
    }

    async fn is_access_point_reachable(&self, name: &str) -> Result<bool, OsError> {
        for attempt in 1..=PING_ATTEMPTS {
            if self.driver.is_access_point_reachable(name, PING_TIMEOUT).await? {
                return Ok(true);
            }
            trace!(interface = %name, attempt, "access point did not answer");
            tokio::time::sleep(PING_BACKOFF).await;
        }
        Ok(false)
    }

    /// Power-cycle the radio. Returns whether it came back.
    async fn reset_device(&self) -> Result<bool, OsError> {
        if self.driver.is_device_powered().await? {
            info!("turning WiFi device off");
            self.driver.set_device_power(false).await?;
        }
        if !self.wait_for_power(false, POWER_OFF_WAIT).await? {
            return Ok(false);
        }
        info!("turning WiFi device on");
        self.driver.set_device_power(true).await?;
        self.wait_for_power(true, POWER_ON_WAIT).await
    }

    async fn wait_for_power(&self, expected: bool, limit: Duration) -> Result<bool, OsError> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            tokio::time::sleep(POWER_POLL).await;
            if self.driver.is_device_powered().await? == expected {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(expected, "WiFi device did not reach power state");
                return Ok(false);
            }
        }
    }

    // ── Per-interface reconciliation ─────────────────────────────────

    async fn reconcile_enabled(&self, iface: &InterfaceConfig) -> Result<(), OsError> {
        let name = iface.name.as_str();
        let mode = iface.wifi_mode();
        let state = self.observe(iface).await?;
        let ssid = iface
            .active_wifi_config()
            .map(|w| w.ssid.clone())
            .unwrap_or_default();

        if !state.up {
            let enable = match mode {
                WifiMode::Master => true,
                WifiMode::Infra => {
                    let ignore_ssid = iface.active_wifi_config().is_some_and(|w| w.ignore_ssid);
                    if ignore_ssid || self.is_access_point_available(name, &ssid).await? {
                        info!(interface = %name, %ssid, "enabling station");
                        true
                    } else {
                        warn!(interface = %name, %ssid, "access point is not available");
                        false
                    }
                }
                WifiMode::Adhoc | WifiMode::Unknown => false,
            };
            if enable {
                if let Err(e) = self.enable(iface).await {
                    error!(interface = %name, error = %e, "enable failed, resetting WiFi device");
                    let recovered = self.reset_device().await?;
                    debug!(interface = %name, recovered, "WiFi device reset");
                }
            }
            return Ok(());
        }

        match mode {
            WifiMode::Infra => {
                let rssi = self.driver.signal_level(name, &ssid).await.unwrap_or_else(|e| {
                    warn!(interface = %name, error = %e, "failed to read signal level");
                    0
                });
                self.rssi.send_replace(rssi);

                if !state.link_up {
                    debug!(interface = %name, "station link is down");
                    return self.disable(name).await;
                }

                let ping = iface.active_wifi_config().is_some_and(|w| w.ping_access_point);
                if ping
                    && iface.is_dhcp_client()
                    && !self.is_access_point_reachable(name).await?
                {
                    info!(interface = %name, "access point unreachable, renewing lease");
                    self.admin.renew_dhcp_lease(name).await?;
                }

                if iface.status() == NetInterfaceStatus::EnabledLan && iface.is_dhcp_client() {
                    if let Some(route) = self.routes.default_route(name).await? {
                        debug!(interface = %name, "LAN/DHCP, removing default route");
                        self.routes.remove_route(&route).await?;
                    }
                }
            }
            WifiMode::Master if !state.link_up => {
                if self.admin.has_address(name).await? {
                    debug!(interface = %name, "access point down with address, bouncing");
                    self.disable(name).await?;
                }
                self.enable(iface).await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn reconcile(&self, iface: &InterfaceConfig) -> Result<(), OsError> {
        let _lock = self.guard.lock(&iface.name).await;

        if is_wifi_enabled(iface) {
            self.reconcile_enabled(iface).await?;
        } else if self.admin.is_up(&iface.name).await? {
            debug!(interface = %iface.name, "disabled in configuration but up");
            self.disable(&iface.name).await?;
        }

        let state = self.observe(iface).await?;
        self.handle.record(&self.bus, state, false);
        Ok(())
    }
}

#[async_trait]
impl Reconciler for WifiLoop {
    const NAME: &'static str = "wifi";

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
            self.apply_configuration(new).await;
        }

        let config = self.handle.configuration();
        for iface in config.interfaces().filter(|i| is_monitored(i)) {
            if let Err(reason) = iface.validate() {
                warn!(interface = %iface.name, %reason, "skipping invalid interface");
                continue;
            }
            if let Err(e) = self.reconcile(iface).await {
                warn!(interface = %iface.name, error = %e, "WiFi reconcile failed");
            }
        }
    }
}
