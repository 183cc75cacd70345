//! Reconciliation loops for the netweave gateway.
//!
//! Each loop periodically compares the desired [`NetworkConfiguration`]
//! against what the OS reports and issues the commands that close the gap:
//!
//! - **[`loops::ethernet`]**: link up/down, WAN default route, LAN DHCP server.
//! - **[`loops::wifi`]**: access point and station lifecycle, radio power-cycle.
//! - **[`loops::cellular`]**: per-modem PPP session, reset timer, GPS.
//! - **[`loops::dns`]**: resolver servers and the local DNS forwarder.
//!
//! The OS is reached only through the traits in [`os`]; [`simulated`]
//! implements them in memory. [`NetworkMonitor`] wires everything to a
//! [`NotificationBus`] and owns the task lifecycle.
//!
//! [`NetworkConfiguration`]: netweave_core::NetworkConfiguration

pub mod bus;
pub mod error;
pub mod guard;
pub mod loops;
pub mod monitor;
pub mod os;
pub mod registry;
pub mod simulated;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{NetworkEvent, NotificationBus};
pub use error::{MonitorError, OsError};
pub use guard::InterfaceGuard;
pub use loops::{LoopHandle, LoopSettings, Reconciler};
pub use monitor::{
    Collaborators, MonitorHandles, MonitorSettings, NetworkMonitor, PublishedConfiguration,
};
pub use os::{
    AccessPoint, CellularModem, DnsForwarder, DnsResolver, ForwarderConfig, ModemDevice,
    ModemDriverFactory, NetworkAdmin, Route, RouteTable, WifiDriver,
};
pub use registry::{ModemCapabilities, ModemTechnology, SupportedModem};
pub use simulated::{SimulatedHost, SimulatedModem, SimulatedModemFactory};
