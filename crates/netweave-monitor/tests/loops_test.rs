#![allow(clippy::unwrap_used)]
// Loop behaviour against the simulated host, on a paused clock so every
// period and timeout elapses deterministically.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use netweave_core::{LinkPhase, NetworkConfiguration, Properties};
use netweave_monitor::loops::{CellularLoop, DnsLoop, EthernetLoop, WifiLoop};
use netweave_monitor::simulated::{HostCall, SimInterface};
use netweave_monitor::{
    InterfaceGuard, LoopSettings, NetworkEvent, NotificationBus, Route, SimulatedHost,
    SimulatedModem, SimulatedModemFactory,
};

// ── Fixtures ────────────────────────────────────────────────────────

fn props(toml_text: &str) -> Properties {
    toml::from_str(toml_text).unwrap()
}

fn config(toml_text: &str) -> Arc<NetworkConfiguration> {
    let cfg = NetworkConfiguration::from_properties(&props(toml_text));
    cfg.validate().unwrap();
    Arc::new(cfg)
}

fn every(secs: u64) -> LoopSettings {
    LoopSettings::every(Duration::from_secs(secs))
}

fn configuration_changed(toml_text: &str) -> NetworkEvent {
    let properties = props(toml_text);
    let configuration = Arc::new(NetworkConfiguration::from_properties(&properties));
    NetworkEvent::ConfigurationChanged {
        properties: Arc::new(properties),
        configuration,
    }
}

fn plugged_in(address: &str, gateway: Option<Ipv4Addr>) -> SimInterface {
    let address: IpAddr = address.parse().unwrap();
    SimInterface {
        up: true,
        address: Some(address),
        carrier: true,
        lease: Some(address),
        gateway,
        ..SimInterface::default()
    }
}

const WAN_DHCP: &str = r#"
"net.interfaces" = "eth0"
"net.interface.eth0.type" = "ETHERNET"
"net.interface.eth0.config.ip4.status" = "netIPv4StatusEnabledWAN"
"net.interface.eth0.config.dhcpClient4.enabled" = true
"#;

const LAN_STATIC: &str = r#"
"net.interfaces" = "eth0"
"net.interface.eth0.type" = "ETHERNET"
"net.interface.eth0.config.ip4.status" = "netIPv4StatusEnabledLAN"
"net.interface.eth0.config.dhcpClient4.enabled" = false
"net.interface.eth0.config.ip4.address" = "172.16.0.1"
"net.interface.eth0.config.ip4.prefix" = 24
"#;

const LAN_DISABLED: &str = r#"
"net.interfaces" = "eth0"
"net.interface.eth0.type" = "ETHERNET"
"net.interface.eth0.config.ip4.status" = "netIPv4StatusDisabled"
"#;

fn is_disable(name: &str) -> impl Fn(&HostCall) -> bool + '_ {
    move |c| matches!(c, HostCall::Disable(n) if n == name)
}

fn is_enable(name: &str) -> impl Fn(&HostCall) -> bool + '_ {
    move |c| matches!(c, HostCall::Enable { name: n, .. } if n == name)
}

// ── Ethernet ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_wan_without_default_route_is_cycled_once() {
    let host = SimulatedHost::new();
    host.add_interface("eth0", plugged_in("10.0.0.7", Some(Ipv4Addr::new(10, 0, 0, 1))));
    let host = Arc::new(host);

    let bus = NotificationBus::new();
    let ethernet = EthernetLoop::new(
        host.clone(),
        host.clone(),
        bus.clone(),
        InterfaceGuard::new(),
        config(WAN_DHCP),
    );
    let handle = ethernet.handle();
    let cancel = CancellationToken::new();
    let task = ethernet.start(every(30), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("eth0")), 1);
    assert_eq!(host.count(is_enable("eth0")), 1);
    assert_eq!(
        host.routes_snapshot(),
        vec![Route::default_via(Ipv4Addr::new(10, 0, 0, 1), "eth0")]
    );

    // Route is in place now: later ticks leave the interface alone.
    sleep(Duration::from_secs(120)).await;
    assert_eq!(host.count(is_disable("eth0")), 1);
    assert_eq!(handle.status("eth0").unwrap().phase(), LinkPhase::UpLinked);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unplugged_cable_takes_interface_down() {
    let host = SimulatedHost::new();
    host.add_interface("eth0", plugged_in("172.16.0.1", None));
    let host = Arc::new(host);

    let ethernet = EthernetLoop::new(
        host.clone(),
        host.clone(),
        NotificationBus::new(),
        InterfaceGuard::new(),
        config(LAN_STATIC),
    );
    let handle = ethernet.handle();
    let cancel = CancellationToken::new();
    let task = ethernet.start(every(30), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("eth0")), 0);

    host.update_interface("eth0", |sim| sim.carrier = false);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(host.count(is_disable("eth0")), 1);
    assert_eq!(handle.status("eth0").unwrap().phase(), LinkPhase::Down);

    // Cable back: brought up again without DHCP.
    host.update_interface("eth0", |sim| sim.carrier = true);
    sleep(Duration::from_secs(30)).await;
    assert!(host.calls().contains(&HostCall::Enable {
        name: "eth0".into(),
        dhcp: false,
    }));
    assert_eq!(handle.status("eth0").unwrap().phase(), LinkPhase::UpLinked);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_configuration_event_wakes_loop_before_period() {
    let host = SimulatedHost::new();
    host.add_interface("eth0", plugged_in("172.16.0.1", None));
    let host = Arc::new(host);

    let bus = NotificationBus::new();
    let ethernet = EthernetLoop::new(
        host.clone(),
        host.clone(),
        bus.clone(),
        InterfaceGuard::new(),
        config(LAN_STATIC),
    );
    let handle = ethernet.handle();
    let cancel = CancellationToken::new();
    let task = ethernet.start(every(300), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("eth0")), 0);

    bus.publish(configuration_changed(LAN_DISABLED));
    sleep(Duration::from_secs(1)).await;

    assert!(host.count(is_disable("eth0")) >= 1);
    assert!(!host.interface("eth0").unwrap().up);
    assert!(!handle.configuration().interface("eth0").unwrap().is_enabled());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_teardown_keeps_change_queued() {
    let host = SimulatedHost::new();
    host.add_interface("eth0", plugged_in("172.16.0.1", None));
    host.fail_disable("eth0", true);
    let host = Arc::new(host);

    let bus = NotificationBus::new();
    let ethernet = EthernetLoop::new(
        host.clone(),
        host.clone(),
        bus.clone(),
        InterfaceGuard::new(),
        config(LAN_STATIC),
    );
    let handle = ethernet.handle();
    let cancel = CancellationToken::new();
    let task = ethernet.start(every(30), cancel.clone());
    sleep(Duration::from_secs(1)).await;

    let old_address = Some(Ipv4Addr::new(172, 16, 0, 1));
    let new_address = Some(Ipv4Addr::new(10, 9, 9, 1));
    let eth0_address = || {
        handle
            .configuration()
            .interface("eth0")
            .and_then(|i| i.ip4())
            .and_then(|ip| ip.address)
    };

    bus.publish(configuration_changed(&LAN_STATIC.replace("172.16.0.1", "10.9.9.1")));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("eth0")), 1);
    assert!(host.interface("eth0").unwrap().up);
    assert_eq!(eth0_address(), old_address);

    // Still failing on the next tick: retried, still not adopted.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(host.count(is_disable("eth0")), 2);
    assert_eq!(eth0_address(), old_address);

    host.fail_disable("eth0", false);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(host.count(is_disable("eth0")), 3);
    assert_eq!(eth0_address(), new_address);
    let calls = host.calls();
    let last_disable = calls.iter().rposition(is_disable("eth0")).unwrap();
    assert!(calls[last_disable..].iter().any(is_enable("eth0")));

    // Applied once: no further teardown.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(host.count(is_disable("eth0")), 3);

    cancel.cancel();
    task.await.unwrap();
}

// ── WiFi ────────────────────────────────────────────────────────────

const ACCESS_POINT: &str = r#"
"net.interfaces" = "wlan0"
"net.interface.wlan0.type" = "WIFI"
"net.interface.wlan0.config.wifi.mode" = "MASTER"
"net.interface.wlan0.config.ip4.status" = "netIPv4StatusEnabledLAN"
"net.interface.wlan0.config.dhcpClient4.enabled" = false
"net.interface.wlan0.config.ip4.address" = "172.16.1.1"
"net.interface.wlan0.config.ip4.prefix" = 24
"net.interface.wlan0.config.wifi.master.ssid" = "gateway"
"#;

const STATION: &str = r#"
"net.interfaces" = "wlan0"
"net.interface.wlan0.type" = "WIFI"
"net.interface.wlan0.config.wifi.mode" = "INFRA"
"net.interface.wlan0.config.ip4.status" = "netIPv4StatusEnabledWAN"
"net.interface.wlan0.config.dhcpClient4.enabled" = true
"net.interface.wlan0.config.wifi.infra.ssid" = "upstream"
"#;

#[tokio::test(start_paused = true)]
async fn test_access_point_without_hostapd_is_bounced() {
    let host = SimulatedHost::new();
    host.add_interface(
        "wlan0",
        SimInterface {
            kernel_mode: netweave_core::WifiMode::Master,
            access_point_running: false,
            ..plugged_in("172.16.1.1", None)
        },
    );
    let host = Arc::new(host);

    let wifi = WifiLoop::new(
        host.clone(),
        host.clone(),
        host.clone(),
        NotificationBus::new(),
        InterfaceGuard::new(),
        config(ACCESS_POINT),
    );
    let handle = wifi.handle();
    let cancel = CancellationToken::new();
    let task = wifi.start(every(10), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("wlan0")), 1);
    assert_eq!(host.count(is_enable("wlan0")), 1);
    assert!(host.interface("wlan0").unwrap().access_point_running);
    assert_eq!(handle.status("wlan0").unwrap().phase(), LinkPhase::UpLinked);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(host.count(is_enable("wlan0")), 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_station_link_is_forced_down_without_supplicant() {
    let host = SimulatedHost::new();
    host.add_interface(
        "wlan0",
        SimInterface {
            kernel_mode: netweave_core::WifiMode::Infra,
            station_running: false,
            ..plugged_in("192.168.8.20", None)
        },
    );
    host.set_access_point_reachable(false);
    let host = Arc::new(host);
    let pinging = format!(
        "{STATION}\"net.interface.wlan0.config.wifi.infra.pingAccessPoint\" = true\n"
    );

    let wifi = WifiLoop::new(
        host.clone(),
        host.clone(),
        host.clone(),
        NotificationBus::new(),
        InterfaceGuard::new(),
        config(&pinging),
    );
    let handle = wifi.handle();
    let cancel = CancellationToken::new();
    let task = wifi.start(every(10), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("wlan0")), 1);
    let state = handle.status("wlan0").unwrap();
    assert!(!state.up);
    assert!(!state.link_up);

    // SSID not in range: stays down, and the lease of the downed
    // interface is left alone.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(host.count(is_enable("wlan0")), 0);
    assert_eq!(host.count(|c| matches!(c, HostCall::RenewLease(_))), 0);

    // SSID shows up: the station is enabled with DHCP.
    host.add_access_point("upstream", 40);
    sleep(Duration::from_secs(10)).await;
    assert!(host.calls().contains(&HostCall::Enable {
        name: "wlan0".into(),
        dhcp: true,
    }));
    assert_eq!(handle.status("wlan0").unwrap().phase(), LinkPhase::UpLinked);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_enable_failure_power_cycles_radio() {
    let host = SimulatedHost::new();
    host.add_interface(
        "wlan0",
        SimInterface {
            carrier: true,
            kernel_mode: netweave_core::WifiMode::Master,
            ..SimInterface::default()
        },
    );
    host.fail_enable("wlan0", true);
    let host = Arc::new(host);

    let wifi = WifiLoop::new(
        host.clone(),
        host.clone(),
        host.clone(),
        NotificationBus::new(),
        InterfaceGuard::new(),
        config(ACCESS_POINT),
    );
    let cancel = CancellationToken::new();
    let task = wifi.start(every(60), cancel.clone());

    sleep(Duration::from_secs(5)).await;
    let power: Vec<_> = host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::DevicePower(_)))
        .collect();
    assert_eq!(power, vec![HostCall::DevicePower(false), HostCall::DevicePower(true)]);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_mode_change_reloads_module_once_teardown_succeeds() {
    let host = SimulatedHost::new();
    host.add_interface(
        "wlan0",
        SimInterface {
            kernel_mode: netweave_core::WifiMode::Master,
            access_point_running: true,
            ..plugged_in("172.16.1.1", None)
        },
    );
    host.fail_disable("wlan0", true);
    let host = Arc::new(host);

    let bus = NotificationBus::new();
    let wifi = WifiLoop::new(
        host.clone(),
        host.clone(),
        host.clone(),
        bus.clone(),
        InterfaceGuard::new(),
        config(ACCESS_POINT),
    );
    let handle = wifi.handle();
    let cancel = CancellationToken::new();
    let task = wifi.start(every(10), cancel.clone());
    sleep(Duration::from_secs(1)).await;

    let is_load = |c: &HostCall| matches!(c, HostCall::LoadModule { name, .. } if name == "wlan0");
    let mode = || handle.configuration().interface("wlan0").unwrap().wifi_mode();

    bus.publish(configuration_changed(STATION));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_disable("wlan0")), 1);
    assert_eq!(host.count(is_load), 0);
    assert_eq!(mode(), netweave_core::WifiMode::Master);

    host.fail_disable("wlan0", false);
    sleep(Duration::from_secs(10)).await;
    assert!(host.calls().contains(&HostCall::LoadModule {
        name: "wlan0".into(),
        mode: netweave_core::WifiMode::Infra,
    }));
    assert_eq!(mode(), netweave_core::WifiMode::Infra);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(host.count(is_load), 1);

    cancel.cancel();
    task.await.unwrap();
}

// ── Cellular ────────────────────────────────────────────────────────

const MODEM: &str = r#"
"net.interfaces" = "1-1.4"
"net.interface.1-1.4.type" = "MODEM"
"net.interface.1-1.4.usb.vendor.id" = "1bc7"
"net.interface.1-1.4.usb.product.id" = "0021"
"net.interface.1-1.4.usb.busNumber" = "1"
"net.interface.1-1.4.usb.devicePath" = "1.4"
"net.interface.1-1.4.config.ip4.status" = "netIPv4StatusEnabledWAN"
"net.interface.1-1.4.config.dhcpClient4.enabled" = true
"net.interface.1-1.4.config.enabled" = true
"net.interface.1-1.4.config.pppNum" = 0
"net.interface.1-1.4.config.apn" = "internet"
"net.interface.1-1.4.config.resetTimeout" = 1
"net.interface.1-1.4.config.gpsEnabled" = true
"#;

#[tokio::test(start_paused = true)]
async fn test_modem_without_session_is_reset_once_per_timeout() {
    let host = SimulatedHost::new();
    host.add_interface("ppp0", SimInterface::default());
    let host = Arc::new(host);

    let modem = Arc::new(SimulatedModem::new("356938035643809"));
    modem.set_connect_succeeds(false);
    let factory = SimulatedModemFactory::new();
    factory.insert("1-1.4", Arc::clone(&modem));

    let bus = NotificationBus::new();
    let mut events = bus.subscribe();
    let cellular = CellularLoop::new(
        host.clone(),
        Arc::new(factory),
        bus.clone(),
        InterfaceGuard::new(),
        config(MODEM),
    );
    let modems = cellular.modems();
    let cancel = CancellationToken::new();
    let task = cellular.start(every(30), cancel.clone());

    // Ticks at 0, 30, 60: not past the one-minute timeout yet.
    sleep(Duration::from_secs(89)).await;
    assert_eq!(modems.ports(), vec!["1-1.4".to_owned()]);
    assert_eq!(modem.counters().resets, 0);
    assert!(modem.counters().connects >= 1);

    assert_eq!(modem.counters().disconnects, 0);
    assert!(modem.gps_enabled());

    // Tick at 90 resets and restarts the timer: one disconnect, GPS off,
    // then the hard reset.
    sleep(Duration::from_secs(2)).await;
    let counters = modem.counters();
    assert_eq!(
        (counters.disconnects, counters.gps_disables, counters.resets),
        (1, 1, 1)
    );
    assert_eq!(
        modem.operations(),
        vec!["enable_gps", "connect", "disconnect", "disable_gps", "reset"]
    );

    sleep(Duration::from_secs(79)).await;
    assert_eq!(modem.counters().resets, 1);
    assert_eq!(modem.counters().disconnects, 1);

    // 90 s after the first reset. GPS came back on the tick after the
    // reset and is switched off again.
    sleep(Duration::from_secs(11)).await;
    let counters = modem.counters();
    assert_eq!(
        (counters.disconnects, counters.gps_disables, counters.resets),
        (2, 2, 2)
    );
    assert!(modem.operations().ends_with(&["disconnect", "disable_gps", "reset"]));

    let mut ready = None;
    while let Ok(event) = events.try_recv() {
        if let NetworkEvent::ModemReady { usb_port, imei, .. } = event {
            ready = Some((usb_port, imei));
        }
    }
    assert_eq!(
        ready,
        Some(("1-1.4".to_owned(), "356938035643809".to_owned()))
    );

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_connected_modem_is_never_reset() {
    let host = SimulatedHost::new();
    host.add_interface("ppp0", SimInterface::default());
    let host = Arc::new(host);

    let modem = Arc::new(SimulatedModem::new("356938035643809"));
    let factory = SimulatedModemFactory::new();
    factory.insert("1-1.4", Arc::clone(&modem));

    let bus = NotificationBus::new();
    let cellular = CellularLoop::new(
        host.clone(),
        Arc::new(factory),
        bus.clone(),
        InterfaceGuard::new(),
        config(MODEM),
    );
    let handle = cellular.handle();
    let cancel = CancellationToken::new();
    let task = cellular.start(every(30), cancel.clone());

    sleep(Duration::from_secs(400)).await;
    assert_eq!(modem.counters().resets, 0);
    assert_eq!(modem.counters().connects, 1);
    assert!(handle.status("ppp0").unwrap().link_up);

    // Unplugged: the modem task stops.
    bus.publish(NetworkEvent::ModemRemoved {
        usb_port: "1-1.4".into(),
    });
    sleep(Duration::from_secs(1)).await;
    modem.set_ppp_state(netweave_core::PppState::NotConnected);
    sleep(Duration::from_secs(120)).await;
    assert_eq!(modem.counters().connects, 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_modem_reconfiguration_retried_after_failed_disconnect() {
    let host = SimulatedHost::new();
    host.add_interface("ppp0", SimInterface::default());
    let host = Arc::new(host);

    let modem = Arc::new(SimulatedModem::new("356938035643809"));
    let factory = SimulatedModemFactory::new();
    factory.insert("1-1.4", Arc::clone(&modem));

    let bus = NotificationBus::new();
    let cellular = CellularLoop::new(
        host.clone(),
        Arc::new(factory),
        bus.clone(),
        InterfaceGuard::new(),
        config(MODEM),
    );
    let cancel = CancellationToken::new();
    let task = cellular.start(every(30), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(modem.counters().connects, 1);

    modem.fail_disconnect(true);
    bus.publish(configuration_changed(&MODEM.replace(
        r#"config.apn" = "internet""#,
        r#"config.apn" = "iot""#,
    )));
    sleep(Duration::from_secs(31)).await;
    assert_eq!(modem.counters().disconnects, 0);
    assert_eq!(modem.counters().connects, 1);

    // Teardown works again: the queued configuration is applied and the
    // session comes back up under it.
    modem.fail_disconnect(false);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(modem.counters().disconnects, 1);
    assert_eq!(modem.counters().connects, 2);

    sleep(Duration::from_secs(90)).await;
    assert_eq!(modem.counters().disconnects, 1);

    cancel.cancel();
    task.await.unwrap();
}

// ── DNS ─────────────────────────────────────────────────────────────

const DNS_PASS: &str = r#"
"net.interfaces" = "eth0,eth1"
"net.interface.eth0.type" = "ETHERNET"
"net.interface.eth0.config.ip4.status" = "netIPv4StatusEnabledWAN"
"net.interface.eth0.config.dhcpClient4.enabled" = false
"net.interface.eth0.config.ip4.address" = "10.0.0.2"
"net.interface.eth0.config.ip4.prefix" = 24
"net.interface.eth0.config.ip4.gateway" = "10.0.0.1"
"net.interface.eth0.config.ip4.dnsServers" = "8.8.8.8"
"net.interface.eth1.type" = "ETHERNET"
"net.interface.eth1.config.ip4.status" = "netIPv4StatusEnabledLAN"
"net.interface.eth1.config.dhcpClient4.enabled" = false
"net.interface.eth1.config.ip4.address" = "172.16.0.1"
"net.interface.eth1.config.ip4.prefix" = 24
"net.interface.eth1.config.dhcpServer4.enabled" = true
"net.interface.eth1.config.dhcpServer4.rangeStart" = "172.16.0.100"
"net.interface.eth1.config.dhcpServer4.rangeEnd" = "172.16.0.200"
"net.interface.eth1.config.dhcpServer4.passDns" = true
"#;

fn is_forwarder_write(c: &HostCall) -> bool {
    matches!(c, HostCall::ForwarderConfig(_))
}

#[tokio::test(start_paused = true)]
async fn test_forwarder_restarts_only_on_effective_change() {
    let host = Arc::new(SimulatedHost::new());
    let bus = NotificationBus::new();
    let dns = DnsLoop::new(host.clone(), host.clone(), bus.clone(), config(DNS_PASS));
    let cancel = CancellationToken::new();
    let task = dns.start(every(60), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    let google: IpAddr = "8.8.8.8".parse().unwrap();
    assert_eq!(host.resolver_servers().into_iter().collect::<Vec<_>>(), vec![google]);
    assert_eq!(host.count(is_forwarder_write), 1);
    assert!(host.forwarder_running());

    // Status churn and periodic ticks: nothing to rewrite.
    bus.publish(NetworkEvent::StatusChanged(Arc::new(
        netweave_core::InterfaceState::down("eth0", netweave_core::InterfaceKind::Ethernet),
    )));
    sleep(Duration::from_secs(180)).await;
    assert_eq!(host.count(is_forwarder_write), 1);
    assert_eq!(host.count(|c| matches!(c, HostCall::SetResolver(_))), 1);

    // LAN stops passing DNS: forwarder reconfigured and left stopped.
    let without_pass = DNS_PASS.replace(
        r#""net.interface.eth1.config.dhcpServer4.passDns" = true"#,
        r#""net.interface.eth1.config.dhcpServer4.passDns" = false"#,
    );
    bus.publish(configuration_changed(&without_pass));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(is_forwarder_write), 2);
    assert!(!host.forwarder_running());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_resolver_never_written_empty() {
    let host = Arc::new(SimulatedHost::new());
    host.set_resolver_servers(["1.1.1.1".parse().unwrap()]);
    let dns = DnsLoop::new(
        host.clone(),
        host.clone(),
        NotificationBus::new(),
        config(LAN_STATIC),
    );
    let cancel = CancellationToken::new();
    let task = dns.start(every(60), cancel.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(host.count(|c| matches!(c, HostCall::SetResolver(_))), 0);
    assert_eq!(host.resolver_servers().len(), 1);

    cancel.cancel();
    task.await.unwrap();
}
