// ── Cellular modem interpreter ──

use std::net::IpAddr;

use crate::error::Result;
use crate::model::modem::{
    DEFAULT_ACTIVE_FILTER, DEFAULT_HOLDOFF, DEFAULT_IDLE, DEFAULT_MAX_FAIL, DEFAULT_RESET_TIMEOUT,
};
use crate::model::{ModemConfig, ModemConnectionType, ModemPdpType, NetConfig, Secret};
use crate::properties::{config_key, Properties};

pub fn parse(props: &Properties, name: &str) -> Result<Vec<NetConfig>> {
    let key = |attr: &str| config_key(name, attr);

    let pdp_type = match props.text(&key("pdpType")) {
        None => ModemPdpType::Ip,
        Some(token) => token.parse().unwrap_or_else(|_| {
            tracing::debug!(interface = name, pdp_type = %token, "unknown PDP type, using IP");
            ModemPdpType::Ip
        }),
    };

    let modem = ModemConfig {
        enabled: props.bool_or(&key("enabled"), false)?,
        connection_type: props
            .parse(&key("connection.type"))?
            .unwrap_or(ModemConnectionType::Ppp),
        ppp_number: props.int_or(&key("pppNum"), 0)?,
        profile_id: props.int_or(&key("profileId"), 0)?,
        apn: props.text(&key("apn")).unwrap_or_default(),
        dial_string: props.text(&key("dialString")).unwrap_or_default(),
        pdp_type,
        auth_type: props.parse(&key("authType"))?.unwrap_or_default(),
        username: props.text(&key("username")).unwrap_or_default(),
        password: Secret::new(props.raw_text(&key("password")).unwrap_or_default()),
        ip_address: props.address::<IpAddr>(&key("ipAddress"))?,
        data_compression: props.int_or(&key("dataCompression"), 0)?,
        header_compression: props.int_or(&key("headerCompression"), 0)?,
        persist: props.bool_or(&key("persist"), true)?,
        holdoff: props.int_or(&key("holdoff"), DEFAULT_HOLDOFF)?,
        max_fail: props.int_or(&key("maxFail"), DEFAULT_MAX_FAIL)?,
        idle: props.int_or(&key("idle"), DEFAULT_IDLE)?,
        active_filter: props
            .text(&key("activeFilter"))
            .unwrap_or_else(|| DEFAULT_ACTIVE_FILTER.to_owned()),
        lcp_echo_interval: props.int_or(&key("lcpEchoInterval"), 0)?,
        lcp_echo_failure: props.int_or(&key("lcpEchoFailure"), 0)?,
        gps_enabled: props.bool_or(&key("gpsEnabled"), false)?,
        diversity_enabled: props.bool_or(&key("diversityEnabled"), false)?,
        reset_timeout: props.int_or(&key("resetTimeout"), DEFAULT_RESET_TIMEOUT)?,
    };
    Ok(vec![modem.into()])
}

pub fn serialize(configs: &[NetConfig], name: &str, props: &mut Properties) {
    let key = |attr: &str| config_key(name, attr);

    for config in configs {
        let NetConfig::Modem(m) = config else {
            continue;
        };
        props.insert(key("enabled"), m.enabled);
        props.insert(key("connection.type"), m.connection_type.to_string());
        props.insert(key("pppNum"), m.ppp_number);
        props.insert(key("profileId"), m.profile_id);
        props.insert(key("apn"), m.apn.as_str());
        props.insert(key("dialString"), m.dial_string.as_str());
        props.insert(key("pdpType"), m.pdp_type.to_string());
        props.insert(key("authType"), m.auth_type.to_string());
        props.insert(key("username"), m.username.as_str());
        props.insert(key("password"), m.password.expose());
        props.insert(
            key("ipAddress"),
            m.ip_address.map(|a| a.to_string()).unwrap_or_default(),
        );
        props.insert(key("dataCompression"), m.data_compression);
        props.insert(key("headerCompression"), m.header_compression);
        props.insert(key("persist"), m.persist);
        props.insert(key("holdoff"), m.holdoff);
        props.insert(key("maxFail"), m.max_fail);
        props.insert(key("idle"), m.idle);
        props.insert(key("activeFilter"), m.active_filter.as_str());
        props.insert(key("lcpEchoInterval"), m.lcp_echo_interval);
        props.insert(key("lcpEchoFailure"), m.lcp_echo_failure);
        props.insert(key("gpsEnabled"), m.gps_enabled);
        props.insert(key("diversityEnabled"), m.diversity_enabled);
        props.insert(key("resetTimeout"), m.reset_timeout);
    }
}
