// ── Property interpreters ──
//
// Pure functions between the flat property map and the typed model, one
// module per protocol family. `serialize` is the inverse of `parse` for
// every valid model.

pub mod firewall;
pub mod ip;
pub mod modem;
pub mod network;
pub mod wifi;

pub use network::{ParsedNetwork, RejectedInterface};
