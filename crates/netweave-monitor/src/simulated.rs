// ── In-memory host ──
//
// `SimulatedHost` implements every collaborator contract against an
// in-memory model of interfaces, routes, radios and DNS state. It backs
// dry runs and the loop tests; every mutating call is recorded.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use netweave_core::{InterfaceKind, ModemConfig, NetworkConfiguration, PppState, WifiMode};

use crate::error::OsError;
use crate::os::{
    AccessPoint, CellularModem, DnsForwarder, DnsResolver, ForwarderConfig, ModemDevice,
    ModemDriverFactory, NetworkAdmin, OsResult, Route, RouteTable, WifiDriver,
};
use crate::registry::SupportedModem;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One mutating call made against the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Enable { name: String, dhcp: bool },
    Disable(String),
    DhcpServer { name: String, enabled: bool },
    RenewLease(String),
    RemoveRoute(String),
    LoadModule { name: String, mode: WifiMode },
    UnloadModule(String),
    DevicePower(bool),
    SetResolver(BTreeSet<IpAddr>),
    ForwarderDisable,
    ForwarderConfig(ForwarderConfig),
    ForwarderEnable,
}

/// Simulated state of one network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimInterface {
    pub up: bool,
    pub address: Option<IpAddr>,
    pub carrier: bool,
    pub carrier_changes: u64,
    pub dhcp_server_running: bool,
    /// Address taken when the interface is enabled.
    pub lease: Option<IpAddr>,
    /// Default gateway installed when the interface is enabled.
    pub gateway: Option<Ipv4Addr>,
    pub kernel_mode: WifiMode,
    pub access_point_running: bool,
    pub station_running: bool,
    pub dhcp_dns_servers: Vec<IpAddr>,
    pub signal_level: i32,
}

#[derive(Debug)]
struct HostState {
    interfaces: BTreeMap<String, SimInterface>,
    routes: Vec<Route>,
    scan: Vec<AccessPoint>,
    access_point_reachable: bool,
    device_powered: bool,
    fail_enable: BTreeSet<String>,
    fail_disable: BTreeSet<String>,
    resolver: BTreeSet<IpAddr>,
    ppp_servers: Vec<IpAddr>,
    forwarder: ForwarderConfig,
    forwarder_running: bool,
    calls: Vec<HostCall>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            interfaces: BTreeMap::new(),
            routes: Vec::new(),
            scan: Vec::new(),
            access_point_reachable: true,
            device_powered: true,
            fail_enable: BTreeSet::new(),
            fail_disable: BTreeSet::new(),
            resolver: BTreeSet::new(),
            ppp_servers: Vec::new(),
            forwarder: ForwarderConfig::default(),
            forwarder_running: false,
            calls: Vec::new(),
        }
    }
}

impl HostState {
    fn interface(&mut self, name: &str) -> OsResult<&mut SimInterface> {
        self.interfaces
            .get_mut(name)
            .ok_or_else(|| OsError::not_found("interface", name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedHost {
    state: Arc<Mutex<HostState>>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host where every configured interface is plugged in and down,
    /// ready to be brought up by the loops.
    pub fn from_configuration(config: &NetworkConfiguration) -> Self {
        let host = Self::new();
        for (index, iface) in config.interfaces().enumerate() {
            let ip4 = iface.ip4();
            let dhcp = ip4.is_some_and(|ip| ip.dhcp);
            let host_octet = u8::try_from(index + 10).unwrap_or(u8::MAX);
            let lease = match ip4.and_then(|ip| ip.address) {
                Some(addr) => Some(IpAddr::V4(addr)),
                None if dhcp => Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, host_octet))),
                None => None,
            };
            let gateway = ip4
                .and_then(|ip| ip.gateway)
                .or_else(|| dhcp.then_some(Ipv4Addr::new(192, 0, 2, 1)));

            let mut sim = SimInterface {
                carrier: iface.kind != InterfaceKind::Modem,
                lease,
                gateway,
                kernel_mode: iface.wifi_mode(),
                signal_level: -55,
                ..SimInterface::default()
            };
            if dhcp {
                sim.dhcp_dns_servers = vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))];
            }
            host.add_interface(&iface.name, sim);

            if let Some(modem) = iface.modem_config() {
                host.add_interface(&modem.ppp_interface(), SimInterface::default());
            }
            if let Some(station) = iface.wifi_config(WifiMode::Infra) {
                host.add_access_point(&station.ssid, 60);
            }
        }
        host
    }

    // ── Setup ────────────────────────────────────────────────────────

    pub fn add_interface(&self, name: &str, sim: SimInterface) {
        lock(&self.state).interfaces.insert(name.to_owned(), sim);
    }

    pub fn update_interface(&self, name: &str, f: impl FnOnce(&mut SimInterface)) {
        if let Some(sim) = lock(&self.state).interfaces.get_mut(name) {
            f(sim);
        }
    }

    pub fn interface(&self, name: &str) -> Option<SimInterface> {
        lock(&self.state).interfaces.get(name).cloned()
    }

    pub fn add_route(&self, route: Route) {
        lock(&self.state).routes.push(route);
    }

    pub fn add_access_point(&self, ssid: &str, strength: i32) {
        lock(&self.state).scan.push(AccessPoint {
            ssid: ssid.to_owned(),
            strength,
        });
    }

    pub fn set_access_point_reachable(&self, reachable: bool) {
        lock(&self.state).access_point_reachable = reachable;
    }

    /// Make `enable_interface(name)` fail until cleared.
    pub fn fail_enable(&self, name: &str, fail: bool) {
        let mut state = lock(&self.state);
        if fail {
            state.fail_enable.insert(name.to_owned());
        } else {
            state.fail_enable.remove(name);
        }
    }

    /// Make `disable_interface(name)` fail until cleared.
    pub fn fail_disable(&self, name: &str, fail: bool) {
        let mut state = lock(&self.state);
        if fail {
            state.fail_disable.insert(name.to_owned());
        } else {
            state.fail_disable.remove(name);
        }
    }

    pub fn set_resolver_servers(&self, servers: impl IntoIterator<Item = IpAddr>) {
        lock(&self.state).resolver = servers.into_iter().collect();
    }

    pub fn set_ppp_servers(&self, servers: Vec<IpAddr>) {
        lock(&self.state).ppp_servers = servers;
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<HostCall> {
        lock(&self.state).calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&HostCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|c| pred(c)).count()
    }

    pub fn routes_snapshot(&self) -> Vec<Route> {
        lock(&self.state).routes.clone()
    }

    pub fn resolver_servers(&self) -> BTreeSet<IpAddr> {
        lock(&self.state).resolver.clone()
    }

    pub fn forwarder_running(&self) -> bool {
        lock(&self.state).forwarder_running
    }

    fn record(&self, call: HostCall) {
        tracing::debug!(?call, "simulated host call");
        lock(&self.state).calls.push(call);
    }
}

// ── NetworkAdmin ─────────────────────────────────────────────────────

#[async_trait]
impl NetworkAdmin for SimulatedHost {
    async fn is_up(&self, name: &str) -> OsResult<bool> {
        Ok(lock(&self.state).interface(name)?.up)
    }

    async fn has_address(&self, name: &str) -> OsResult<bool> {
        Ok(lock(&self.state).interface(name)?.address.is_some())
    }

    async fn current_address(&self, name: &str) -> OsResult<Option<IpAddr>> {
        Ok(lock(&self.state).interface(name)?.address)
    }

    async fn is_link_up(&self, _kind: InterfaceKind, name: &str) -> OsResult<bool> {
        Ok(lock(&self.state).interface(name)?.carrier)
    }

    async fn carrier_changes(&self, name: &str) -> OsResult<u64> {
        Ok(lock(&self.state).interface(name)?.carrier_changes)
    }

    async fn enable_interface(&self, name: &str, dhcp: bool) -> OsResult<()> {
        self.record(HostCall::Enable {
            name: name.to_owned(),
            dhcp,
        });
        let mut state = lock(&self.state);
        if state.fail_enable.contains(name) {
            return Err(OsError::command("ifup", name, "simulated failure"));
        }
        let sim = state.interface(name)?;
        sim.up = true;
        sim.address = sim.lease;
        match sim.kernel_mode {
            WifiMode::Master => sim.access_point_running = true,
            WifiMode::Infra => sim.station_running = true,
            WifiMode::Adhoc | WifiMode::Unknown => {}
        }
        let gateway = sim.gateway;
        if let Some(gateway) = gateway {
            state.routes.push(Route::default_via(gateway, name));
        }
        Ok(())
    }

    async fn disable_interface(&self, name: &str) -> OsResult<()> {
        self.record(HostCall::Disable(name.to_owned()));
        let mut state = lock(&self.state);
        if state.fail_disable.contains(name) {
            return Err(OsError::command("ifdown", name, "simulated failure"));
        }
        let sim = state.interface(name)?;
        sim.up = false;
        sim.address = None;
        sim.access_point_running = false;
        sim.station_running = false;
        state.routes.retain(|r| r.interface != name);
        Ok(())
    }

    async fn manage_dhcp_server(&self, name: &str, enabled: bool) -> OsResult<()> {
        self.record(HostCall::DhcpServer {
            name: name.to_owned(),
            enabled,
        });
        lock(&self.state).interface(name)?.dhcp_server_running = enabled;
        Ok(())
    }

    async fn is_dhcp_server_running(&self, name: &str) -> OsResult<bool> {
        Ok(lock(&self.state).interface(name)?.dhcp_server_running)
    }

    async fn renew_dhcp_lease(&self, name: &str) -> OsResult<()> {
        self.record(HostCall::RenewLease(name.to_owned()));
        Ok(())
    }
}

// ── RouteTable ───────────────────────────────────────────────────────

#[async_trait]
impl RouteTable for SimulatedHost {
    async fn default_route(&self, name: &str) -> OsResult<Option<Route>> {
        Ok(lock(&self.state)
            .routes
            .iter()
            .find(|r| r.interface == name && r.is_default())
            .cloned())
    }

    async fn routes(&self) -> OsResult<Vec<Route>> {
        Ok(self.routes_snapshot())
    }

    async fn remove_route(&self, route: &Route) -> OsResult<()> {
        self.record(HostCall::RemoveRoute(route.interface.clone()));
        lock(&self.state).routes.retain(|r| r != route);
        Ok(())
    }
}

// ── WifiDriver ───────────────────────────────────────────────────────

#[async_trait]
impl WifiDriver for SimulatedHost {
    async fn load_kernel_module(&self, name: &str, mode: WifiMode) -> OsResult<()> {
        self.record(HostCall::LoadModule {
            name: name.to_owned(),
            mode,
        });
        lock(&self.state).interface(name)?.kernel_mode = mode;
        Ok(())
    }

    async fn unload_kernel_module(&self, name: &str) -> OsResult<()> {
        self.record(HostCall::UnloadModule(name.to_owned()));
        lock(&self.state).interface(name)?.kernel_mode = WifiMode::Unknown;
        Ok(())
    }

    async fn scan(&self, _name: &str) -> OsResult<Vec<AccessPoint>> {
        Ok(lock(&self.state).scan.clone())
    }

    async fn is_access_point_process_running(&self, name: &str) -> OsResult<bool> {
        Ok(lock(&self.state).interface(name)?.access_point_running)
    }

    async fn is_station_process_running(&self, name: &str) -> OsResult<bool> {
        Ok(lock(&self.state).interface(name)?.station_running)
    }

    async fn kernel_mode(&self, name: &str) -> OsResult<WifiMode> {
        Ok(lock(&self.state).interface(name)?.kernel_mode)
    }

    async fn is_access_point_reachable(&self, _name: &str, _timeout: Duration) -> OsResult<bool> {
        Ok(lock(&self.state).access_point_reachable)
    }

    async fn signal_level(&self, name: &str, _ssid: &str) -> OsResult<i32> {
        Ok(lock(&self.state).interface(name)?.signal_level)
    }

    async fn is_device_powered(&self) -> OsResult<bool> {
        Ok(lock(&self.state).device_powered)
    }

    async fn set_device_power(&self, on: bool) -> OsResult<()> {
        self.record(HostCall::DevicePower(on));
        lock(&self.state).device_powered = on;
        Ok(())
    }
}

// ── DNS ──────────────────────────────────────────────────────────────

#[async_trait]
impl DnsResolver for SimulatedHost {
    async fn servers(&self) -> OsResult<BTreeSet<IpAddr>> {
        Ok(self.resolver_servers())
    }

    async fn set_servers(&self, servers: &BTreeSet<IpAddr>) -> OsResult<()> {
        self.record(HostCall::SetResolver(servers.clone()));
        lock(&self.state).resolver = servers.clone();
        Ok(())
    }

    async fn dhcp_servers(&self, name: &str) -> OsResult<Vec<IpAddr>> {
        Ok(lock(&self.state).interface(name)?.dhcp_dns_servers.clone())
    }

    async fn ppp_servers(&self) -> OsResult<Vec<IpAddr>> {
        Ok(lock(&self.state).ppp_servers.clone())
    }
}

#[async_trait]
impl DnsForwarder for SimulatedHost {
    async fn config(&self) -> OsResult<ForwarderConfig> {
        Ok(lock(&self.state).forwarder.clone())
    }

    async fn set_config(&self, config: &ForwarderConfig) -> OsResult<()> {
        self.record(HostCall::ForwarderConfig(config.clone()));
        lock(&self.state).forwarder = config.clone();
        Ok(())
    }

    async fn enable(&self) -> OsResult<()> {
        self.record(HostCall::ForwarderEnable);
        lock(&self.state).forwarder_running = true;
        Ok(())
    }

    async fn disable(&self) -> OsResult<()> {
        self.record(HostCall::ForwarderDisable);
        lock(&self.state).forwarder_running = false;
        Ok(())
    }
}

// ── Cellular ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModemCounters {
    pub connects: usize,
    pub disconnects: usize,
    pub resets: usize,
    pub provisions: usize,
    pub gps_enables: usize,
    pub gps_disables: usize,
    pub diversity_sets: usize,
}

#[derive(Debug)]
struct ModemState {
    ppp: PppState,
    connect_succeeds: bool,
    sim_ready: bool,
    gps: bool,
    provisioned: bool,
    signal: i32,
    fail_disconnect: bool,
    counters: ModemCounters,
    operations: Vec<&'static str>,
}

#[derive(Debug)]
pub struct SimulatedModem {
    imei: String,
    state: Mutex<ModemState>,
}

impl SimulatedModem {
    pub fn new(imei: impl Into<String>) -> Self {
        Self {
            imei: imei.into(),
            state: Mutex::new(ModemState {
                ppp: PppState::NotConnected,
                connect_succeeds: true,
                sim_ready: true,
                gps: false,
                provisioned: true,
                signal: -70,
                fail_disconnect: false,
                counters: ModemCounters::default(),
                operations: Vec::new(),
            }),
        }
    }

    /// Whether `connect` establishes a session or leaves it in progress.
    pub fn set_connect_succeeds(&self, succeeds: bool) {
        lock(&self.state).connect_succeeds = succeeds;
    }

    pub fn set_ppp_state(&self, ppp: PppState) {
        lock(&self.state).ppp = ppp;
    }

    pub fn set_sim_ready(&self, ready: bool) {
        lock(&self.state).sim_ready = ready;
    }

    pub fn set_provisioned(&self, provisioned: bool) {
        lock(&self.state).provisioned = provisioned;
    }

    pub fn counters(&self) -> ModemCounters {
        lock(&self.state).counters.clone()
    }

    pub fn gps_enabled(&self) -> bool {
        lock(&self.state).gps
    }

    /// Make `disconnect` fail until cleared.
    pub fn fail_disconnect(&self, fail: bool) {
        lock(&self.state).fail_disconnect = fail;
    }

    /// Session-affecting calls in the order they were made: `connect`,
    /// `disconnect`, `reset`, `enable_gps` and `disable_gps`.
    pub fn operations(&self) -> Vec<&'static str> {
        lock(&self.state).operations.clone()
    }
}

#[async_trait]
impl CellularModem for SimulatedModem {
    async fn model(&self) -> OsResult<String> {
        Ok("simulated".into())
    }

    async fn serial_number(&self) -> OsResult<String> {
        Ok(self.imei.clone())
    }

    async fn imsi(&self) -> OsResult<String> {
        Ok(format!("001010{}", &self.imei[self.imei.len().saturating_sub(9)..]))
    }

    async fn iccid(&self) -> OsResult<String> {
        Ok(format!("8901{}", self.imei))
    }

    async fn ppp_state(&self) -> OsResult<PppState> {
        Ok(lock(&self.state).ppp)
    }

    async fn connect(&self, _config: &ModemConfig) -> OsResult<()> {
        let mut state = lock(&self.state);
        state.operations.push("connect");
        state.counters.connects += 1;
        state.ppp = if state.connect_succeeds {
            PppState::Connected
        } else {
            PppState::InProgress
        };
        Ok(())
    }

    async fn disconnect(&self) -> OsResult<()> {
        let mut state = lock(&self.state);
        if state.fail_disconnect {
            return Err(OsError::command("disconnect", &self.imei, "simulated failure"));
        }
        state.operations.push("disconnect");
        state.counters.disconnects += 1;
        state.ppp = PppState::NotConnected;
        Ok(())
    }

    async fn reset(&self) -> OsResult<()> {
        let mut state = lock(&self.state);
        state.operations.push("reset");
        state.counters.resets += 1;
        state.ppp = PppState::NotConnected;
        Ok(())
    }

    async fn is_sim_card_ready(&self) -> OsResult<bool> {
        Ok(lock(&self.state).sim_ready)
    }

    async fn is_gps_enabled(&self) -> OsResult<bool> {
        Ok(lock(&self.state).gps)
    }

    async fn enable_gps(&self) -> OsResult<()> {
        let mut state = lock(&self.state);
        state.operations.push("enable_gps");
        state.counters.gps_enables += 1;
        state.gps = true;
        Ok(())
    }

    async fn disable_gps(&self) -> OsResult<()> {
        let mut state = lock(&self.state);
        state.operations.push("disable_gps");
        state.counters.gps_disables += 1;
        state.gps = false;
        Ok(())
    }

    async fn set_diversity(&self, _enabled: bool) -> OsResult<()> {
        lock(&self.state).counters.diversity_sets += 1;
        Ok(())
    }

    async fn is_provisioned(&self) -> OsResult<bool> {
        Ok(lock(&self.state).provisioned)
    }

    async fn provision(&self) -> OsResult<()> {
        let mut state = lock(&self.state);
        state.counters.provisions += 1;
        state.provisioned = true;
        Ok(())
    }

    async fn signal_strength(&self) -> OsResult<i32> {
        Ok(lock(&self.state).signal)
    }
}

/// Hands out `SimulatedModem`s keyed by USB port, creating them on demand.
#[derive(Debug, Clone, Default)]
pub struct SimulatedModemFactory {
    modems: Arc<Mutex<HashMap<String, Arc<SimulatedModem>>>>,
}

impl SimulatedModemFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, usb_port: &str, modem: Arc<SimulatedModem>) {
        lock(&self.modems).insert(usb_port.to_owned(), modem);
    }

    pub fn modem(&self, usb_port: &str) -> Option<Arc<SimulatedModem>> {
        lock(&self.modems).get(usb_port).cloned()
    }
}

#[async_trait]
impl ModemDriverFactory for SimulatedModemFactory {
    async fn create(
        &self,
        model: &SupportedModem,
        device: &ModemDevice,
    ) -> OsResult<Arc<dyn CellularModem>> {
        let port = device.usb_port();
        tracing::debug!(usb_port = %port, model = model.model, "creating simulated modem");
        let modem = Arc::clone(
            lock(&self.modems)
                .entry(port)
                .or_insert_with(|| Arc::new(SimulatedModem::new("356938035643809"))),
        );
        Ok(modem)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn enable_installs_lease_and_default_route() {
        let host = SimulatedHost::new();
        host.add_interface(
            "eth0",
            SimInterface {
                carrier: true,
                lease: Some("10.0.0.5".parse().unwrap()),
                gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
                ..SimInterface::default()
            },
        );

        host.enable_interface("eth0", true).await.unwrap();
        assert!(host.is_up("eth0").await.unwrap());
        assert_eq!(
            host.default_route("eth0").await.unwrap(),
            Some(Route::default_via(Ipv4Addr::new(10, 0, 0, 1), "eth0"))
        );

        host.disable_interface("eth0").await.unwrap();
        assert!(!host.has_address("eth0").await.unwrap());
        assert!(host.routes().await.unwrap().is_empty());
        assert_eq!(host.calls().len(), 2);
    }

    #[tokio::test]
    async fn unknown_interface_is_not_found() {
        let host = SimulatedHost::new();
        let err = host.is_up("eth9").await.unwrap_err();
        assert!(matches!(err, OsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn modem_reset_drops_the_session() {
        let modem = SimulatedModem::new("123456789012345");
        modem.connect(&ModemConfig::default()).await.unwrap();
        assert_eq!(modem.ppp_state().await.unwrap(), PppState::Connected);
        modem.reset().await.unwrap();
        assert_eq!(modem.ppp_state().await.unwrap(), PppState::NotConnected);
        assert_eq!(modem.counters().resets, 1);
        assert_eq!(modem.imsi().await.unwrap(), "001010789012345");
    }
}
