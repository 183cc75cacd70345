//! Daemon settings for netweave.
//!
//! Loop periods, the property file holding the desired network
//! configuration, and logging. Values come from built-in defaults, then
//! the TOML config file, then `NETWEAVE_` environment variables (nested
//! keys separated by `__`, e.g. `NETWEAVE_LOOPS__WIFI_SECS=5`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netweave_monitor::{LoopSettings, MonitorSettings};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaemonConfig {
    /// Property file with the desired network configuration.
    #[serde(default = "default_properties")]
    pub properties: PathBuf,

    #[serde(default)]
    pub loops: LoopPeriods,

    #[serde(default)]
    pub logging: Logging,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            properties: default_properties(),
            loops: LoopPeriods::default(),
            logging: Logging::default(),
        }
    }
}

fn default_properties() -> PathBuf {
    PathBuf::from("/etc/netweave/network.toml")
}

/// Reconciliation periods in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoopPeriods {
    #[serde(default = "default_ethernet_secs")]
    pub ethernet_secs: u64,
    #[serde(default = "default_wifi_secs")]
    pub wifi_secs: u64,
    #[serde(default = "default_cellular_secs")]
    pub cellular_secs: u64,
    #[serde(default = "default_dns_secs")]
    pub dns_secs: u64,
}

impl Default for LoopPeriods {
    fn default() -> Self {
        Self {
            ethernet_secs: default_ethernet_secs(),
            wifi_secs: default_wifi_secs(),
            cellular_secs: default_cellular_secs(),
            dns_secs: default_dns_secs(),
        }
    }
}

fn default_ethernet_secs() -> u64 {
    30
}
fn default_wifi_secs() -> u64 {
    10
}
fn default_cellular_secs() -> u64 {
    30
}
fn default_dns_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Logging {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Also write logs to this file (daily rotation).
    pub file: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_level() -> String {
    "info".into()
}

impl DaemonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("loops.ethernet_secs", self.loops.ethernet_secs),
            ("loops.wifi_secs", self.loops.wifi_secs),
            ("loops.cellular_secs", self.loops.cellular_secs),
            ("loops.dns_secs", self.loops.dns_secs),
        ];
        if let Some((field, _)) = periods.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Validation {
                field: (*field).into(),
                reason: "period must be at least one second".into(),
            });
        }
        if self.properties.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                field: "properties".into(),
                reason: "path is empty".into(),
            });
        }
        Ok(())
    }

    /// Loop periods in the form the monitor takes them.
    pub fn monitor_settings(&self) -> MonitorSettings {
        let every = |secs| LoopSettings::every(Duration::from_secs(secs));
        MonitorSettings {
            ethernet: every(self.loops.ethernet_secs),
            wifi: every(self.loops.wifi_secs),
            cellular: every(self.loops.cellular_secs),
            dns: every(self.loops.dns_secs),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "netweave", "netweave").map_or_else(
        || PathBuf::from("/etc/netweave/netweave.toml"),
        |dirs| dirs.config_dir().join("netweave.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DaemonConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETWEAVE_").split("__"))
}

/// Load and validate the config at `path`, or at [`config_path`].
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: DaemonConfig = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &DaemonConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.monitor_settings(), MonitorSettings::default());
    }

    #[test]
    fn file_overrides_defaults_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netweave.toml");
        std::fs::write(
            &path,
            r#"
properties = "/data/network.toml"

[loops]
wifi_secs = 5

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.properties, PathBuf::from("/data/network.toml"));
        assert_eq!(config.loops.wifi_secs, 5);
        assert_eq!(config.loops.ethernet_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            config.monitor_settings().wifi,
            LoopSettings::every(Duration::from_secs(5))
        );
    }

    #[test]
    fn zero_period_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netweave.toml");
        std::fs::write(&path, "[loops]\ndns_secs = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(
            matches!(&err, ConfigError::Validation { field, .. } if field == "loops.dns_secs"),
            "{err}"
        );
    }

    #[test]
    fn malformed_file_is_a_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netweave.toml");
        std::fs::write(&path, "[loops]\nwifi_secs = \"often\"\n").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("netweave.toml");
        let mut config = DaemonConfig::default();
        config.loops.cellular_secs = 45;
        config.logging.file = Some(PathBuf::from("/var/log/netweave.log"));

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }
}
