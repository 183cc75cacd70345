// ── Cellular modem configuration ──

use std::net::IpAddr;
use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};

use super::common::Secret;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
pub enum ModemPdpType {
    #[default]
    #[strum(serialize = "IP")]
    Ip,
    #[strum(serialize = "PPP")]
    Ppp,
    #[strum(serialize = "IPv6")]
    Ipv6,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ModemAuthType {
    #[default]
    None,
    Auto,
    Pap,
    Chap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ModemConnectionType {
    #[default]
    Ppp,
    DirectIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ModemConnectionStatus {
    #[default]
    Unknown,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Failed,
}

// ── Defaults ─────────────────────────────────────────────────────────

pub const DEFAULT_HOLDOFF: u32 = 1;
pub const DEFAULT_MAX_FAIL: u32 = 5;
pub const DEFAULT_IDLE: u32 = 95;
pub const DEFAULT_ACTIVE_FILTER: &str = "inbound";
/// Minutes without a PPP session before the modem is hard-reset.
pub const DEFAULT_RESET_TIMEOUT: u32 = 5;

/// PPP / data-session settings for one cellular interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModemConfig {
    pub enabled: bool,
    pub connection_type: ModemConnectionType,
    pub ppp_number: u32,
    pub profile_id: i32,
    pub apn: String,
    pub dial_string: String,
    pub pdp_type: ModemPdpType,
    pub auth_type: ModemAuthType,
    pub username: String,
    pub password: Secret,
    pub ip_address: Option<IpAddr>,
    pub data_compression: i32,
    pub header_compression: i32,
    pub persist: bool,
    pub holdoff: u32,
    pub max_fail: u32,
    pub idle: u32,
    pub active_filter: String,
    pub lcp_echo_interval: u32,
    pub lcp_echo_failure: u32,
    pub gps_enabled: bool,
    pub diversity_enabled: bool,
    /// Minutes; `0` disables the reset timer.
    pub reset_timeout: u32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            connection_type: ModemConnectionType::Ppp,
            ppp_number: 0,
            profile_id: 0,
            apn: String::new(),
            dial_string: String::new(),
            pdp_type: ModemPdpType::Ip,
            auth_type: ModemAuthType::None,
            username: String::new(),
            password: Secret::default(),
            ip_address: None,
            data_compression: 0,
            header_compression: 0,
            persist: true,
            holdoff: DEFAULT_HOLDOFF,
            max_fail: DEFAULT_MAX_FAIL,
            idle: DEFAULT_IDLE,
            active_filter: DEFAULT_ACTIVE_FILTER.into(),
            lcp_echo_interval: 0,
            lcp_echo_failure: 0,
            gps_enabled: false,
            diversity_enabled: false,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

impl ModemConfig {
    /// Name of the PPP link this config drives (`ppp0`, `ppp1`, ...).
    pub fn ppp_interface(&self) -> String {
        format!("ppp{}", self.ppp_number)
    }

    pub fn reset_timeout_duration(&self) -> Option<Duration> {
        (self.reset_timeout > 0).then(|| Duration::from_secs(u64::from(self.reset_timeout) * 60))
    }

    /// Credentials are required unless authentication is off.
    pub fn is_valid(&self) -> bool {
        self.auth_type == ModemAuthType::None || !self.username.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_timeout_in_minutes() {
        let mut cfg = ModemConfig::default();
        assert_eq!(cfg.reset_timeout_duration(), Some(Duration::from_secs(300)));
        cfg.reset_timeout = 0;
        assert_eq!(cfg.reset_timeout_duration(), None);
    }

    #[test]
    fn ppp_interface_name_follows_number() {
        let cfg = ModemConfig {
            ppp_number: 2,
            ..ModemConfig::default()
        };
        assert_eq!(cfg.ppp_interface(), "ppp2");
    }

    #[test]
    fn chap_without_username_is_invalid() {
        let cfg = ModemConfig {
            auth_type: ModemAuthType::Chap,
            ..ModemConfig::default()
        };
        assert!(!cfg.is_valid());
    }
}
