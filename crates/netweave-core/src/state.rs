// ── Interface state machine ──
//
// Observed runtime state of one interface, derived from OS facts. A loop
// emits a status-change notification whenever the freshly observed state
// differs from the last one it recorded.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::model::{InterfaceKind, ModemConnectionStatus, NetInterfaceStatus, WifiMode};

/// PPP session state reported by a cellular modem driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PppState {
    #[default]
    NotConnected,
    InProgress,
    Connected,
}

impl From<PppState> for ModemConnectionStatus {
    fn from(state: PppState) -> Self {
        match state {
            PppState::NotConnected => Self::Disconnected,
            PppState::InProgress => Self::Connecting,
            PppState::Connected => Self::Connected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum LinkPhase {
    Down,
    UpNoLink,
    UpLinked,
}

/// Class-specific facts that decide whether the link is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSemantics {
    /// Physical carrier only.
    Ethernet,
    Wifi {
        mode: WifiMode,
        access_point_running: bool,
        station_running: bool,
        kernel_mode: WifiMode,
    },
    Cellular { ppp: PppState },
}

impl LinkSemantics {
    pub fn kind(self) -> InterfaceKind {
        match self {
            Self::Ethernet => InterfaceKind::Ethernet,
            Self::Wifi { .. } => InterfaceKind::Wifi,
            Self::Cellular { .. } => InterfaceKind::Modem,
        }
    }

    /// Apply the class rule to the physical carrier.
    pub fn link_up(self, carrier: bool) -> bool {
        match self {
            Self::Ethernet => carrier,
            Self::Wifi {
                mode,
                access_point_running,
                station_running,
                kernel_mode,
            } => {
                let process_running = match mode {
                    WifiMode::Master => access_point_running,
                    WifiMode::Infra => station_running,
                    WifiMode::Adhoc | WifiMode::Unknown => false,
                };
                carrier && process_running && kernel_mode == mode
            }
            Self::Cellular { ppp } => ppp == PppState::Connected,
        }
    }
}

/// Raw observations gathered from the collaborators in one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedLink {
    /// Administrative flag.
    pub is_up: bool,
    pub has_address: bool,
    pub carrier: bool,
    pub carrier_changes: u64,
    pub address: Option<IpAddr>,
    pub semantics: LinkSemantics,
    /// Declared IPv4 status; L2-only interfaces never get an address.
    pub status: NetInterfaceStatus,
}

impl ObservedLink {
    pub fn new(semantics: LinkSemantics, status: NetInterfaceStatus) -> Self {
        Self {
            is_up: false,
            has_address: false,
            carrier: false,
            carrier_changes: 0,
            address: None,
            semantics,
            status,
        }
    }
}

// ── InterfaceState ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceState {
    pub name: String,
    pub kind: InterfaceKind,
    pub up: bool,
    pub link_up: bool,
    pub address: Option<IpAddr>,
    pub carrier_changes: u64,
}

impl InterfaceState {
    /// Derive the state. An interface is up when it holds an address, or
    /// for L2-only when its administrative flag is set.
    pub fn observe(name: impl Into<String>, link: &ObservedLink) -> Self {
        let up = if link.status == NetInterfaceStatus::L2Only {
            link.is_up
        } else {
            link.has_address
        };
        Self {
            name: name.into(),
            kind: link.semantics.kind(),
            up,
            link_up: link.semantics.link_up(link.carrier),
            address: link.address,
            carrier_changes: link.carrier_changes,
        }
    }

    /// Down interface with no link.
    pub fn down(name: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            up: false,
            link_up: false,
            address: None,
            carrier_changes: 0,
        }
    }

    pub fn phase(&self) -> LinkPhase {
        match (self.up, self.link_up) {
            (false, _) => LinkPhase::Down,
            (true, false) => LinkPhase::UpNoLink,
            (true, true) => LinkPhase::UpLinked,
        }
    }
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.phase())?;
        if let Some(addr) = self.address {
            write!(f, " {addr}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wifi(mode: WifiMode, ap: bool, sta: bool, kernel: WifiMode) -> LinkSemantics {
        LinkSemantics::Wifi {
            mode,
            access_point_running: ap,
            station_running: sta,
            kernel_mode: kernel,
        }
    }

    fn linked(semantics: LinkSemantics) -> ObservedLink {
        ObservedLink {
            is_up: true,
            has_address: true,
            carrier: true,
            carrier_changes: 3,
            address: Some("10.0.0.2".parse().unwrap()),
            ..ObservedLink::new(semantics, NetInterfaceStatus::EnabledLan)
        }
    }

    #[test]
    fn ethernet_link_follows_carrier() {
        let mut link = linked(LinkSemantics::Ethernet);
        assert_eq!(InterfaceState::observe("eth0", &link).phase(), LinkPhase::UpLinked);
        link.carrier = false;
        assert_eq!(InterfaceState::observe("eth0", &link).phase(), LinkPhase::UpNoLink);
    }

    #[test]
    fn wifi_link_is_forced_down_without_process() {
        let master = linked(wifi(WifiMode::Master, false, true, WifiMode::Master));
        assert!(!InterfaceState::observe("wlan0", &master).link_up);

        let station = linked(wifi(WifiMode::Infra, true, false, WifiMode::Infra));
        assert!(!InterfaceState::observe("wlan0", &station).link_up);

        let ok = linked(wifi(WifiMode::Infra, false, true, WifiMode::Infra));
        assert!(InterfaceState::observe("wlan0", &ok).link_up);
    }

    #[test]
    fn wifi_link_requires_matching_kernel_mode() {
        let link = linked(wifi(WifiMode::Master, true, false, WifiMode::Infra));
        assert!(!InterfaceState::observe("wlan0", &link).link_up);
    }

    #[test]
    fn cellular_link_is_ppp_connected() {
        let mut link = linked(LinkSemantics::Cellular {
            ppp: PppState::InProgress,
        });
        link.carrier = false;
        assert!(!InterfaceState::observe("ppp0", &link).link_up);
        link.semantics = LinkSemantics::Cellular {
            ppp: PppState::Connected,
        };
        assert!(InterfaceState::observe("ppp0", &link).link_up);
    }

    #[test]
    fn l2_only_up_ignores_address() {
        let mut link = ObservedLink::new(LinkSemantics::Ethernet, NetInterfaceStatus::L2Only);
        link.is_up = true;
        assert!(InterfaceState::observe("eth1", &link).up);

        link.status = NetInterfaceStatus::EnabledLan;
        assert!(!InterfaceState::observe("eth1", &link).up);
    }

    #[test]
    fn carrier_changes_take_part_in_equality() {
        let link = linked(LinkSemantics::Ethernet);
        let a = InterfaceState::observe("eth0", &link);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.carrier_changes += 1;
        assert_ne!(a, b);
    }
}
