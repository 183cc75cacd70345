//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use netweave_config::ConfigError;
use netweave_core::NetError;
use netweave_monitor::MonitorError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const INVALID: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Property files ───────────────────────────────────────────────

    #[error("Property file not found: {path}")]
    #[diagnostic(
        code(netweave::properties_not_found),
        help(
            "Pass the file explicitly or set `properties` in the daemon config.\n\
             Try: netweave check /etc/netweave/network.toml"
        )
    )]
    PropertiesNotFound { path: String },

    #[error("Could not parse property file {path}")]
    #[diagnostic(
        code(netweave::properties_syntax),
        help("Property files are flat TOML tables of quoted dotted keys.")
    )]
    PropertiesSyntax {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    // ── Configuration model ──────────────────────────────────────────

    #[error("{count} interface(s) could not be interpreted")]
    #[diagnostic(
        code(netweave::rejected_interfaces),
        help("Rejected: {names}\nRun with -v to see the offending keys.")
    )]
    RejectedInterfaces { count: usize, names: String },

    #[error(transparent)]
    #[diagnostic(code(netweave::network))]
    Net(#[from] NetError),

    // ── Runtime ──────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(netweave::monitor))]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    #[diagnostic(
        code(netweave::config),
        help("Check the daemon config file and NETWEAVE_* environment variables.")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(netweave::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PropertiesNotFound { .. } => exit_code::NOT_FOUND,
            Self::PropertiesSyntax { .. } | Self::Config(_) => exit_code::USAGE,
            Self::RejectedInterfaces { .. } | Self::Net(_) => exit_code::INVALID,
            Self::Monitor(_) | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}
