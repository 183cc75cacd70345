//! Network configuration model for an embedded gateway.
//!
//! Desired state lives in a flat [`Properties`] map of dotted keys. This
//! crate turns that map into a typed [`NetworkConfiguration`] and back:
//!
//! - **[`interpret`]**: pure parse/serialize functions per protocol family
//!   (IP, WiFi, cellular modem, firewall) plus the network-level walk over
//!   `net.interfaces`.
//! - **[`codec`]**: the positional `,`/`;`/`#` text format of firewall
//!   open-port, port-forward and NAT rules.
//! - **[`diff`]**: decides which interfaces must be reconfigured when a
//!   new configuration replaces the current one.
//! - **[`state`]**: observed interface state and the per-class link rules
//!   the reconciliation loops use to emit status changes.

pub mod codec;
pub mod diff;
pub mod error;
pub mod interpret;
pub mod model;
pub mod properties;
pub mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use diff::{changed_interfaces, needs_reconfiguration, ReconfigurationReason};
pub use error::{NetError, Result};
pub use properties::{Properties, PropertyValue};
pub use state::{InterfaceState, LinkPhase, LinkSemantics, ObservedLink, PppState};

pub use model::{
    AddressFamily, DhcpServerConfig4, FirewallAutoNatConfig, FirewallConfiguration,
    InterfaceAddressConfig, InterfaceConfig, InterfaceKind, ModemConfig, ModemConnectionStatus,
    ModemIdentity, NatRule, NetConfig, NetConfigIp4, NetConfigIp6, NetConfigKind,
    NetInterfaceStatus, NetworkConfiguration, OpenPortRule, PortForwardRule, PortSpec, Protocol,
    Secret, UsbDevice, WifiConfig, WifiMode,
};
