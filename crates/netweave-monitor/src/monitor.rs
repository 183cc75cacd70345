// ── NetworkMonitor ──
//
// Supervisor owning the bus, the interface guard and the four loops.
// Mirrors the controller lifecycle: `start` spawns every task under a
// child token, `stop` cancels and joins them.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netweave_core::{NetworkConfiguration, Properties};

use crate::bus::{NetworkEvent, NotificationBus};
use crate::error::MonitorError;
use crate::guard::InterfaceGuard;
use crate::loops::cellular::ModemBoard;
use crate::loops::{CellularLoop, DnsLoop, EthernetLoop, LoopHandle, LoopSettings, WifiLoop};
use crate::os::{
    DnsForwarder, DnsResolver, ModemDevice, ModemDriverFactory, NetworkAdmin, RouteTable,
    WifiDriver,
};
use crate::simulated::{SimulatedHost, SimulatedModemFactory};

/// OS-facing implementations the loops are built with.
#[derive(Clone)]
pub struct Collaborators {
    pub admin: Arc<dyn NetworkAdmin>,
    pub routes: Arc<dyn RouteTable>,
    pub wifi: Arc<dyn WifiDriver>,
    pub modems: Arc<dyn ModemDriverFactory>,
    pub resolver: Arc<dyn DnsResolver>,
    pub forwarder: Arc<dyn DnsForwarder>,
}

impl Collaborators {
    pub fn simulated(host: &SimulatedHost, factory: &SimulatedModemFactory) -> Self {
        let host = Arc::new(host.clone());
        Self {
            admin: host.clone(),
            routes: host.clone(),
            wifi: host.clone(),
            modems: Arc::new(factory.clone()),
            resolver: host.clone(),
            forwarder: host,
        }
    }
}

/// Per-loop periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub ethernet: LoopSettings,
    pub wifi: LoopSettings,
    pub cellular: LoopSettings,
    pub dns: LoopSettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            ethernet: LoopSettings::every(Duration::from_secs(30)),
            wifi: LoopSettings::every(Duration::from_secs(10)),
            cellular: LoopSettings::every(Duration::from_secs(30)),
            dns: LoopSettings::every(Duration::from_secs(60)),
        }
    }
}

/// Shared views of every loop.
#[derive(Debug, Clone)]
pub struct MonitorHandles {
    pub ethernet: LoopHandle,
    pub wifi: LoopHandle,
    pub cellular: LoopHandle,
    pub dns: LoopHandle,
}

/// What `publish_configuration` handed to the loops.
#[derive(Debug, Clone)]
pub struct PublishedConfiguration {
    pub configuration: Arc<NetworkConfiguration>,
    /// Interfaces that failed validation. The loops skip them and keep
    /// reconciling the rest.
    pub invalid: Vec<String>,
}

struct Loops {
    ethernet: EthernetLoop,
    wifi: WifiLoop,
    cellular: CellularLoop,
    dns: DnsLoop,
}

pub struct NetworkMonitor {
    bus: NotificationBus,
    settings: MonitorSettings,
    configuration: ArcSwap<NetworkConfiguration>,
    handles: MonitorHandles,
    modems: ModemBoard,
    wifi_rssi: watch::Receiver<i32>,
    cellular_rssi: watch::Receiver<i32>,
    loops: Option<Loops>,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl NetworkMonitor {
    /// Build every loop around `initial`, the configuration the host is
    /// assumed to already run.
    pub fn new(
        collaborators: Collaborators,
        settings: MonitorSettings,
        initial: NetworkConfiguration,
    ) -> Self {
        let bus = NotificationBus::new();
        let guard = InterfaceGuard::new();
        let initial = Arc::new(initial);

        let ethernet = EthernetLoop::new(
            Arc::clone(&collaborators.admin),
            Arc::clone(&collaborators.routes),
            bus.clone(),
            guard.clone(),
            Arc::clone(&initial),
        );
        let wifi = WifiLoop::new(
            Arc::clone(&collaborators.admin),
            Arc::clone(&collaborators.routes),
            Arc::clone(&collaborators.wifi),
            bus.clone(),
            guard.clone(),
            Arc::clone(&initial),
        );
        let cellular = CellularLoop::new(
            Arc::clone(&collaborators.admin),
            Arc::clone(&collaborators.modems),
            bus.clone(),
            guard,
            Arc::clone(&initial),
        );
        let dns = DnsLoop::new(
            Arc::clone(&collaborators.resolver),
            Arc::clone(&collaborators.forwarder),
            bus.clone(),
            Arc::clone(&initial),
        );

        let handles = MonitorHandles {
            ethernet: ethernet.handle(),
            wifi: wifi.handle(),
            cellular: cellular.handle(),
            dns: dns.handle(),
        };

        Self {
            bus,
            settings,
            configuration: ArcSwap::new(initial),
            handles,
            modems: cellular.modems(),
            wifi_rssi: wifi.rssi(),
            cellular_rssi: cellular.rssi(),
            loops: Some(Loops {
                ethernet,
                wifi,
                cellular,
                dns,
            }),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn every loop. Calling it again is a no-op.
    pub fn start(&mut self) {
        let Some(loops) = self.loops.take() else {
            warn!("network monitor already started");
            return;
        };
        let settings = self.settings;
        let child = self.cancel.child_token();

        self.tasks = vec![
            ("ethernet", loops.ethernet.start(settings.ethernet, child.clone())),
            ("wifi", loops.wifi.start(settings.wifi, child.clone())),
            ("cellular", loops.cellular.start(settings.cellular, child.clone())),
            ("dns", loops.dns.start(settings.dns, child)),
        ];
        info!(loops = self.tasks.len(), "network monitor started");
    }

    /// Cancel every loop and wait for it to finish.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        self.cancel.cancel();
        let mut first_error = None;
        for (name, task) in self.tasks.drain(..) {
            match task.await {
                Ok(()) => debug!(reconciler = name, "loop joined"),
                Err(e) => {
                    warn!(reconciler = name, error = %e, "loop task failed");
                    first_error.get_or_insert(MonitorError::Join(e));
                }
            }
        }
        info!("network monitor stopped");
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty() && !self.cancel.is_cancelled()
    }

    /// Token whose cancellation stops every loop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ── Configuration & notifications ────────────────────────────────

    /// Interpret `props` and hand the result to every loop. Interfaces
    /// that fail validation are reported and skipped by the loops; they do
    /// not hold back the rest of the configuration.
    pub fn publish_configuration(&self, props: &Properties) -> PublishedConfiguration {
        let configuration = Arc::new(NetworkConfiguration::from_properties(props));
        let invalid: Vec<String> = configuration
            .interfaces()
            .filter_map(|iface| {
                let reason = iface.validate().err()?;
                warn!(
                    interface = %iface.name,
                    %reason,
                    "invalid interface will not be reconciled"
                );
                Some(iface.name.clone())
            })
            .collect();

        self.configuration.store(Arc::clone(&configuration));
        self.bus.publish(NetworkEvent::ConfigurationChanged {
            properties: Arc::new(props.clone()),
            configuration: Arc::clone(&configuration),
        });
        info!(
            interfaces = configuration.len(),
            invalid = invalid.len(),
            "configuration published"
        );
        PublishedConfiguration {
            configuration,
            invalid,
        }
    }

    pub fn modem_added(&self, device: ModemDevice) {
        self.bus.publish(NetworkEvent::ModemAdded(device));
    }

    pub fn modem_removed(&self, usb_port: impl Into<String>) {
        self.bus.publish(NetworkEvent::ModemRemoved {
            usb_port: usb_port.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.bus.subscribe()
    }

    // ── Views ────────────────────────────────────────────────────────

    /// The most recently published configuration.
    pub fn configuration(&self) -> Arc<NetworkConfiguration> {
        self.configuration.load_full()
    }

    pub fn handles(&self) -> &MonitorHandles {
        &self.handles
    }

    pub fn modems(&self) -> &ModemBoard {
        &self.modems
    }

    pub fn wifi_rssi(&self) -> watch::Receiver<i32> {
        self.wifi_rssi.clone()
    }

    pub fn cellular_rssi(&self) -> watch::Receiver<i32> {
        self.cellular_rssi.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn monitor() -> NetworkMonitor {
        let host = SimulatedHost::new();
        NetworkMonitor::new(
            Collaborators::simulated(&host, &SimulatedModemFactory::new()),
            MonitorSettings::default(),
            NetworkConfiguration::new(),
        )
    }

    #[tokio::test]
    async fn invalid_interface_does_not_hold_back_the_rest() {
        let monitor = monitor();
        let mut rx = monitor.subscribe();

        let mut props = Properties::new();
        props.insert("net.interfaces", "eth0,eth1");
        props.insert("net.interface.eth0.type", "ETHERNET");
        props.insert("net.interface.eth0.config.mtu", -1_i64);
        props.insert("net.interface.eth1.type", "ETHERNET");
        props.insert("net.interface.eth1.config.ip4.status", "netIPv4StatusEnabledLAN");
        props.insert("net.interface.eth1.config.dhcpClient4.enabled", true);

        let published = monitor.publish_configuration(&props);
        assert_eq!(published.invalid, vec!["eth0".to_owned()]);
        assert_eq!(published.configuration.len(), 2);
        match rx.try_recv().unwrap() {
            NetworkEvent::ConfigurationChanged { configuration, .. } => {
                assert!(configuration.interface("eth1").unwrap().is_enabled());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(monitor.configuration(), published.configuration);
    }

    #[tokio::test]
    async fn valid_configuration_reaches_subscribers() {
        let monitor = monitor();
        let mut rx = monitor.subscribe();

        let mut props = Properties::new();
        props.insert("net.interfaces", "eth0");
        props.insert("net.interface.eth0.type", "ETHERNET");
        props.insert("net.interface.eth0.config.ip4.status", "netIPv4StatusEnabledWAN");
        props.insert("net.interface.eth0.config.dhcpClient4.enabled", true);

        let published = monitor.publish_configuration(&props);
        assert!(published.invalid.is_empty());
        assert_eq!(published.configuration.len(), 1);
        match rx.try_recv().unwrap() {
            NetworkEvent::ConfigurationChanged { configuration, .. } => {
                assert_eq!(configuration, published.configuration);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_stop_joins_every_loop() {
        let mut monitor = monitor();
        monitor.start();
        assert!(monitor.is_running());
        monitor.start();
        monitor.stop().await.unwrap();
        assert!(!monitor.is_running());
    }
}
