// ── DNS reconciliation ──
//
// Keeps the resolver pointed at the DNS servers of the WAN interfaces and
// the local forwarder serving every LAN whose DHCP server passes DNS.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netweave_core::{InterfaceConfig, InterfaceKind, NetInterfaceStatus, NetworkConfiguration};

use super::{LoopHandle, LoopSettings, Reconciler};
use crate::bus::{NetworkEvent, NotificationBus};
use crate::error::OsError;
use crate::os::{DnsForwarder, DnsResolver, ForwarderConfig};

const FORWARDER_RESTART_DELAY: Duration = Duration::from_millis(500);

fn carries_dns(iface: &InterfaceConfig) -> bool {
    matches!(
        iface.kind,
        InterfaceKind::Ethernet | InterfaceKind::Wifi | InterfaceKind::Modem
    )
}

/// Networks allowed to query the forwarder: router/prefix of every DHCP
/// server that passes DNS.
pub fn allowed_networks(config: &NetworkConfiguration) -> BTreeSet<Ipv4Net> {
    config
        .interfaces()
        .filter(|i| carries_dns(i))
        .filter_map(InterfaceConfig::dhcp_server4)
        .filter(|server| server.pass_dns)
        .filter_map(|server| Ipv4Net::new(server.router_address, server.prefix).ok())
        .collect()
}

pub struct DnsLoop {
    resolver: Arc<dyn DnsResolver>,
    forwarder: Arc<dyn DnsForwarder>,
    bus: NotificationBus,
    handle: LoopHandle,
    pending: Option<Arc<NetworkConfiguration>>,
}

impl DnsLoop {
    pub fn new(
        resolver: Arc<dyn DnsResolver>,
        forwarder: Arc<dyn DnsForwarder>,
        bus: NotificationBus,
        initial: Arc<NetworkConfiguration>,
    ) -> Self {
        Self {
            resolver,
            forwarder,
            bus,
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

    /// Servers of one WAN interface: the user list, or for DHCP without
    /// one, whatever the DHCP client or PPP daemon learned.
    async fn interface_servers(&self, iface: &InterfaceConfig) -> Result<Vec<IpAddr>, OsError> {
        let Some(ip4) = iface.ip4() else {
            return Ok(Vec::new());
        };
        if !ip4.dns_servers.is_empty() || !ip4.dhcp {
            return Ok(ip4.dns_servers.iter().copied().map(IpAddr::V4).collect());
        }
        if iface.kind == InterfaceKind::Modem {
            self.resolver.ppp_servers().await
        } else {
            self.resolver.dhcp_servers(&iface.name).await
        }
    }

    async fn configured_servers(&self, config: &NetworkConfiguration) -> BTreeSet<IpAddr> {
        let mut servers = BTreeSet::new();
        for iface in config
            .interfaces()
            .filter(|i| carries_dns(i) && i.status() == NetInterfaceStatus::EnabledWan)
        {
            match self.interface_servers(iface).await {
                Ok(found) => servers.extend(found),
                Err(e) => warn!(interface = %iface.name, error = %e, "failed to read DNS servers"),
            }
        }
        servers
    }

    async fn update_resolver(&self, config: &NetworkConfiguration) -> Result<(), OsError> {
        let wanted = self.configured_servers(config).await;
        if wanted.is_empty() {
            warn!("no DNS servers configured, leaving resolver untouched");
            return Ok(());
        }
        let current = self.resolver.servers().await?;
        if current == wanted {
            debug!("resolver already up to date");
            return Ok(());
        }
        info!(servers = ?wanted, "updating resolver");
        self.resolver.set_servers(&wanted).await
    }

    async fn update_forwarder(&self, config: &NetworkConfiguration) -> Result<(), OsError> {
        let desired = ForwarderConfig {
            forwarders: self.resolver.servers().await?,
            allowed_networks: allowed_networks(config),
        };
        if self.forwarder.config().await? == desired {
            return Ok(());
        }

        info!(
            forwarders = ?desired.forwarders,
            allowed = ?desired.allowed_networks,
            "DNS forwarder configuration changed, restarting"
        );
        self.forwarder.disable().await?;
        self.forwarder.set_config(&desired).await?;
        if desired.is_enabled() {
            tokio::time::sleep(FORWARDER_RESTART_DELAY).await;
            self.forwarder.enable().await?;
        } else {
            debug!("DNS forwarder not enabled");
        }
        Ok(())
    }
}

#[async_trait]
impl Reconciler for DnsLoop {
    const NAME: &'static str = "dns";

    fn accept(&mut self, event: &NetworkEvent) -> bool {
        match event {
            NetworkEvent::ConfigurationChanged { configuration, .. } => {
                self.pending = Some(Arc::clone(configuration));
                true
            }
            NetworkEvent::StatusChanged(_) => true,
            _ => false,
        }
    }

    async fn tick(&mut self) {
        if let Some(new) = self.pending.take() {
            self.handle.adopt(new);
        }
        let config = self.handle.configuration();

        if let Err(e) = self.update_resolver(&config).await {
            warn!(error = %e, "resolver update failed");
        }
        if let Err(e) = self.update_forwarder(&config).await {
            warn!(error = %e, "DNS forwarder update failed");
        }
    }
}
