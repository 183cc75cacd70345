// ── Monitor error types ──
//
// `OsError` is what a collaborator reports when an OS-level operation
// fails. Loops log it and retry on the next tick; it never stops a loop.

use netweave_core::NetError;
use thiserror::Error;

/// Failure reported by a collaborator (process, sysfs, serial port).
#[derive(Debug, Error)]
pub enum OsError {
    #[error("{operation} failed on {target}: {message}")]
    CommandFailed {
        operation: String,
        target: String,
        message: String,
    },

    #[error("{what} not found: {name}")]
    NotFound { what: String, name: String },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OsError {
    pub fn command(
        operation: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            name: name.into(),
        }
    }
}

/// Errors surfaced by the supervisor to its caller.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Os(#[from] OsError),

    #[error("Unsupported modem {vendor_id}:{product_id}")]
    UnsupportedModem {
        vendor_id: String,
        product_id: String,
    },

    #[error("Loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
