// ── WiFi domain types ──

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use strum::{Display, EnumString};

use super::common::Secret;

/// Operating mode of a wireless interface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum WifiMode {
    #[default]
    Unknown,
    Adhoc,
    /// Station (client) mode.
    Infra,
    /// Access-point mode.
    Master,
}

impl WifiMode {
    /// Lower-case segment used in property keys (`config.wifi.master.ssid`).
    pub fn key_segment(self) -> String {
        self.to_string().to_ascii_lowercase()
    }

    pub fn is_operational(self) -> bool {
        matches!(self, Self::Infra | Self::Master)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
pub enum WifiSecurity {
    #[default]
    #[strum(to_string = "SECURITY_NONE", serialize = "NONE")]
    None,
    #[strum(serialize = "SECURITY_WEP")]
    Wep,
    #[strum(serialize = "SECURITY_WPA")]
    Wpa,
    #[strum(serialize = "SECURITY_WPA2")]
    Wpa2,
    #[strum(serialize = "SECURITY_WPA_WPA2")]
    WpaWpa2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
pub enum WifiRadioMode {
    #[strum(serialize = "RADIO_MODE_80211a")]
    A,
    #[strum(serialize = "RADIO_MODE_80211b")]
    B,
    #[strum(serialize = "RADIO_MODE_80211g")]
    G,
    #[strum(serialize = "RADIO_MODE_80211nHT20")]
    NHt20,
    #[strum(serialize = "RADIO_MODE_80211nHT40below")]
    NHt40Below,
    #[strum(serialize = "RADIO_MODE_80211nHT40above")]
    NHt40Above,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WifiCiphers {
    Ccmp,
    Tkip,
    CcmpTkip,
}

// ── Background scan ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BgscanModule {
    #[default]
    None,
    Simple,
    Learn,
}

/// Station background-scan policy, encoded `module:short:rssi:long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WifiBgscan {
    pub module: BgscanModule,
    pub short_interval: u32,
    pub rssi_threshold: i32,
    pub long_interval: u32,
}

impl fmt::Display for WifiBgscan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module == BgscanModule::None {
            return Ok(());
        }
        write!(
            f,
            "{}:{}:{}:{}",
            self.module, self.short_interval, self.rssi_threshold, self.long_interval
        )
    }
}

impl FromStr for WifiBgscan {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        let mut parts = s.split(':');
        let module: BgscanModule = parts.next().unwrap_or_default().trim().parse()?;
        let mut next_num = || -> Result<i64, strum::ParseError> {
            parts
                .next()
                .map_or(Ok(0), |p| p.trim().parse().map_err(|_| strum::ParseError::VariantNotFound))
        };
        let short_interval = u32::try_from(next_num()?).map_err(|_| strum::ParseError::VariantNotFound)?;
        let rssi_threshold = i32::try_from(next_num()?).map_err(|_| strum::ParseError::VariantNotFound)?;
        let long_interval = u32::try_from(next_num()?).map_err(|_| strum::ParseError::VariantNotFound)?;
        Ok(Self {
            module,
            short_interval,
            rssi_threshold,
            long_interval,
        })
    }
}

// ── WifiConfig ───────────────────────────────────────────────────────

/// Settings for one WiFi mode. An interface carries one per mode; only
/// the fragment matching the active mode is applied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WifiConfig {
    pub mode: WifiMode,
    pub ssid: String,
    pub driver: String,
    pub security: WifiSecurity,
    pub passphrase: Secret,
    pub hardware_mode: String,
    pub broadcast: bool,
    pub channels: Vec<u16>,
    pub radio_mode: Option<WifiRadioMode>,
    pub pairwise_ciphers: Option<WifiCiphers>,
    pub group_ciphers: Option<WifiCiphers>,
    pub bgscan: Option<WifiBgscan>,
    pub ping_access_point: bool,
    /// Station mode: connect without first seeing the SSID in a scan.
    pub ignore_ssid: bool,
}

impl WifiConfig {
    pub fn new(mode: WifiMode, ssid: impl Into<String>) -> Self {
        Self {
            mode,
            ssid: ssid.into(),
            broadcast: true,
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mode != WifiMode::Unknown && self.channels.iter().all(|c| (1..=196).contains(c))
    }
}
