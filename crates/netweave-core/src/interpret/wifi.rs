// ── WiFi interpreter ──
//
// Each interface may carry a MASTER and an INFRA fragment under
// `config.wifi.<mode>.`; the active mode lives in `config.wifi.mode`.

use crate::error::{NetError, Result};
use crate::model::{NetConfig, Secret, WifiBgscan, WifiConfig, WifiMode};
use crate::properties::{config_key, Properties};

const MODES: [WifiMode; 2] = [WifiMode::Master, WifiMode::Infra];

/// Key of the active-mode selector.
pub fn mode_key(name: &str) -> String {
    config_key(name, "wifi.mode")
}

/// Active mode; INFRA when unset.
pub fn parse_mode(props: &Properties, name: &str) -> Result<WifiMode> {
    Ok(props.parse(&mode_key(name))?.unwrap_or(WifiMode::Infra))
}

pub fn parse(props: &Properties, name: &str) -> Result<Vec<NetConfig>> {
    let mut configs = Vec::new();
    for mode in MODES {
        let prefix = fragment_prefix(name, mode);
        if props.subset(&prefix).is_empty() {
            continue;
        }
        let fragment = parse_fragment(props, &prefix, mode)?;
        if fragment.is_valid() {
            configs.push(fragment.into());
        } else {
            tracing::warn!(interface = name, %mode, "dropping invalid WiFi configuration");
        }
    }
    Ok(configs)
}

fn fragment_prefix(name: &str, mode: WifiMode) -> String {
    config_key(name, &format!("wifi.{}.", mode.key_segment()))
}

fn parse_fragment(props: &Properties, prefix: &str, mode: WifiMode) -> Result<WifiConfig> {
    let key = |attr: &str| format!("{prefix}{attr}");

    let mut wifi = WifiConfig::new(mode, props.text(&key("ssid")).unwrap_or_default());
    wifi.driver = props.text(&key("driver")).unwrap_or_default();
    wifi.security = props.parse(&key("securityType"))?.unwrap_or_default();
    wifi.passphrase = Secret::new(props.raw_text(&key("passphrase")).unwrap_or_default());
    wifi.hardware_mode = props.text(&key("hardwareMode")).unwrap_or_default();
    wifi.broadcast = props.bool_or(&key("broadcast"), true)?;
    wifi.channels = parse_channels(props, &key("channel"))?;
    wifi.radio_mode = props.parse(&key("radioMode"))?;
    wifi.pairwise_ciphers = props.parse(&key("pairwiseCiphers"))?;
    wifi.group_ciphers = props.parse(&key("groupCiphers"))?;

    if mode == WifiMode::Infra {
        wifi.bgscan = props.parse::<WifiBgscan>(&key("bgscan"))?;
        wifi.ping_access_point = props.bool_or(&key("pingAccessPoint"), false)?;
        wifi.ignore_ssid = props.bool_or(&key("ignoreSSID"), false)?;
    }
    Ok(wifi)
}

/// Channels are space separated (`"1 6 11"`).
fn parse_channels(props: &Properties, key: &str) -> Result<Vec<u16>> {
    let Some(text) = props.text(key) else {
        return Ok(Vec::new());
    };
    text.split_whitespace()
        .map(|c| {
            c.parse::<u16>()
                .map_err(|_| NetError::invalid_property(key, text.clone(), "expected channel numbers"))
        })
        .collect()
}

// ── Serialization ────────────────────────────────────────────────────

pub fn serialize(configs: &[NetConfig], name: &str, props: &mut Properties) {
    for config in configs {
        let NetConfig::Wifi(wifi) = config else {
            continue;
        };
        if !wifi.mode.is_operational() {
            continue;
        }
        let prefix = fragment_prefix(name, wifi.mode);
        let key = |attr: &str| format!("{prefix}{attr}");

        props.insert(key("ssid"), wifi.ssid.as_str());
        props.insert(key("driver"), wifi.driver.as_str());
        props.insert(key("securityType"), wifi.security.to_string());
        props.insert(key("passphrase"), wifi.passphrase.expose());
        props.insert(key("hardwareMode"), wifi.hardware_mode.as_str());
        props.insert(key("broadcast"), wifi.broadcast);
        props.insert(
            key("channel"),
            wifi.channels
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        );
        props.insert(key("radioMode"), opt_token(wifi.radio_mode));
        props.insert(key("pairwiseCiphers"), opt_token(wifi.pairwise_ciphers));
        props.insert(key("groupCiphers"), opt_token(wifi.group_ciphers));

        if wifi.mode == WifiMode::Infra {
            props.insert(key("bgscan"), opt_token(wifi.bgscan));
            props.insert(key("pingAccessPoint"), wifi.ping_access_point);
            props.insert(key("ignoreSSID"), wifi.ignore_ssid);
        }
    }
}

fn opt_token<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
