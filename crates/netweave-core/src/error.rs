// ── Core error types ──
//
// Errors raised while interpreting, validating, and encoding network
// configuration. Failures of the OS collaborators are not represented
// here -- they live in netweave-monitor.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    // ── Property errors ──────────────────────────────────────────────
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid address {value:?} for {key}")]
    InvalidAddress { key: String, value: String },

    // ── Firewall errors ──────────────────────────────────────────────
    #[error("Invalid firewall record {record:?}: {reason}")]
    FirewallRule { record: String, reason: String },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Unsupported: {what}")]
    Unsupported { what: String },
}

impl NetError {
    pub(crate) fn invalid_property(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_address(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAddress {
            key: key.into(),
            value: value.into(),
        }
    }

    pub(crate) fn firewall(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FirewallRule {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// The property key this error refers to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::InvalidProperty { key, .. } | Self::InvalidAddress { key, .. } => Some(key),
            _ => None,
        }
    }
}

pub type Result<T, E = NetError> = std::result::Result<T, E>;
