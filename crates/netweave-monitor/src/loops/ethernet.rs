// ── Ethernet reconciliation ──
//
// Keeps every configured Ethernet interface in the administrative state
// its configuration asks for: brought up when the cable is plugged in,
// taken down when it is pulled, WAN default route present, LAN DHCP
// server running.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use netweave_core::{
    changed_interfaces, InterfaceConfig, InterfaceKind, InterfaceState, LinkSemantics,
    NetInterfaceStatus, NetworkConfiguration,
};

use super::{observe_link, LoopHandle, LoopSettings, Reconciler};
use crate::bus::{NetworkEvent, NotificationBus};
use crate::error::OsError;
use crate::guard::InterfaceGuard;
use crate::os::{NetworkAdmin, RouteTable};

pub struct EthernetLoop {
    admin: Arc<dyn NetworkAdmin>,
    routes: Arc<dyn RouteTable>,
    bus: NotificationBus,
    guard: InterfaceGuard,
    handle: LoopHandle,
    pending: Option<Arc<NetworkConfiguration>>,
}

impl EthernetLoop {
    pub fn new(
        admin: Arc<dyn NetworkAdmin>,
        routes: Arc<dyn RouteTable>,
        bus: NotificationBus,
        guard: InterfaceGuard,
        initial: Arc<NetworkConfiguration>,
    ) -> Self {
        Self {
            admin,
            routes,
            bus,
            guard,
            handle: LoopHandle::new(initial),
            pending: None,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn start(self, settings: LoopSettings, cancel: CancellationToken) -> JoinHandle<()> {
        let bus = self.bus.clone();
        super::spawn(self, &bus, settings, cancel)
    }

    /// Take down every Ethernet interface whose configuration changed,
    /// then adopt the new configuration for those that went down cleanly.
    /// An interface whose teardown failed keeps its previous configuration
    /// and `new` stays queued for the next tick. Returns the names applied.
    async fn apply_configuration(&mut self, new: Arc<NetworkConfiguration>) -> Vec<String> {
        let old = self.handle.configuration();
        let changed = changed_interfaces(&old, &new, |i| i.kind == InterfaceKind::Ethernet);

        let mut applied = Vec::with_capacity(changed.len());
        let mut failed = Vec::new();
        for name in changed {
            info!(interface = %name, "new ethernet configuration");
            let _lock = self.guard.lock(&name).await;
            if let Err(e) = self.disable(&name).await {
                warn!(
                    interface = %name,
                    error = %e,
                    "failed to disable before reconfiguring, will retry"
                );
                failed.push(name);
                continue;
            }
            if new.interface(&name).is_none() {
                self.handle.forget(&name);
            }
            applied.push(name);
        }

        if failed.is_empty() {
            self.handle.adopt(new);
        } else {
            self.handle.adopt(Arc::new(new.with_interfaces_from(&old, &failed)));
            self.pending = Some(new);
        }
        applied
    }

    /// Link down plus DHCP server off.
    async fn disable(&self, name: &str) -> Result<(), OsError> {
        self.admin.disable_interface(name).await?;
        self.admin.manage_dhcp_server(name, false).await
    }

    async fn observe(&self, iface: &InterfaceConfig) -> Result<InterfaceState, OsError> {
        let link = observe_link(&*self.admin, &iface.name, iface, LinkSemantics::Ethernet).await?;
        Ok(InterfaceState::observe(&iface.name, &link))
    }

    async fn has_default_route(&self, name: &str) -> Result<bool, OsError> {
        let routes = self.routes.routes().await?;
        Ok(routes.iter().any(|r| r.interface == name && r.is_default()))
    }

    async fn reconcile(&self, iface: &InterfaceConfig, force_status: bool) -> Result<(), OsError> {
        let name = iface.name.as_str();
        let _lock = self.guard.lock(name).await;

        let enabled = iface.is_enabled();
        let dhcp = iface.is_dhcp_client();
        let status = iface.status();
        let mut state = self.observe(iface).await?;

        let mut touched = false;
        if enabled {
            if state.up && !state.link_up {
                debug!(interface = %name, "link is down, disabling");
                self.disable(name).await?;
                touched = true;
            } else if !state.up && state.link_up {
                debug!(interface = %name, dhcp, "link is up, enabling");
                self.admin.enable_interface(name, dhcp).await?;
                touched = true;
            }
        } else if state.up {
            debug!(interface = %name, "disabled in configuration but up");
            self.disable(name).await?;
            touched = true;
        }
        if touched {
            state = self.observe(iface).await?;
        }

        let server_wanted = status == NetInterfaceStatus::EnabledLan
            && iface.dhcp_server4().is_some_and(|s| s.enabled);
        let linked = state.up && state.link_up;

        if linked {
            match status {
                NetInterfaceStatus::EnabledWan => {
                    let static_gateway = iface.ip4().and_then(|ip| ip.gateway).is_some();
                    if !self.has_default_route(name).await? && (dhcp || static_gateway) {
                        error!(
                            interface = %name,
                            "WAN interface has no default route, restarting it"
                        );
                        self.admin.disable_interface(name).await?;
                        self.admin.enable_interface(name, dhcp).await?;
                        state = self.observe(iface).await?;
                    }
                }
                NetInterfaceStatus::EnabledLan if dhcp => {
                    if let Some(route) = self.routes.default_route(name).await? {
                        debug!(interface = %name, gateway = %route.gateway, "LAN/DHCP, removing default route");
                        self.routes.remove_route(&route).await?;
                    }
                }
                _ => {}
            }
        }

        let running = self.admin.is_dhcp_server_running(name).await?;
        if linked && server_wanted && !running {
            debug!(interface = %name, "starting DHCP server");
            self.admin.manage_dhcp_server(name, true).await?;
        } else if !(linked && server_wanted) && running {
            debug!(interface = %name, "stopping DHCP server");
            self.admin.manage_dhcp_server(name, false).await?;
        }

        self.handle.record(&self.bus, state, force_status);
        Ok(())
    }
}

#[async_trait]
impl Reconciler for EthernetLoop {
    const NAME: &'static str = "ethernet";

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
        let applied = match self.pending.take() {
            Some(new) => self.apply_configuration(new).await,
            None => Vec::new(),
        };

        let config = self.handle.configuration();
        for iface in config.interfaces_of(InterfaceKind::Ethernet) {
            if let Err(reason) = iface.validate() {
                warn!(interface = %iface.name, %reason, "skipping invalid interface");
                continue;
            }
            let force = applied.iter().any(|c| c == &iface.name);
            if let Err(e) = self.reconcile(iface, force).await {
                warn!(interface = %iface.name, error = %e, "ethernet reconcile failed");
            }
        }
    }
}
