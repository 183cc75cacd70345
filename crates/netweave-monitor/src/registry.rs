// ── Supported modem registry ──
//
// Static table keyed on USB vendor/product id. Resolves a discovered
// device to its driver family and to the capabilities the cellular loop
// must exercise.

use serde::Serialize;
use strum::{Display, EnumString};

use netweave_core::UsbDevice;

/// Radio technology family of a modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ModemTechnology {
    Hspa,
    Evdo,
    Lte,
}

/// Capabilities the cellular loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ModemCapabilities {
    pub sim_check: bool,
    pub gps: bool,
    pub diversity: bool,
    /// EVDO-class modems carry their account on the device and must be
    /// provisioned before the first connection.
    pub provisioning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedModem {
    pub vendor_id: &'static str,
    pub product_id: &'static str,
    pub vendor: &'static str,
    pub model: &'static str,
    pub technology: ModemTechnology,
    pub capabilities: ModemCapabilities,
}

const fn caps(sim_check: bool, gps: bool, diversity: bool, provisioning: bool) -> ModemCapabilities {
    ModemCapabilities {
        sim_check,
        gps,
        diversity,
        provisioning,
    }
}

pub static SUPPORTED_MODEMS: &[SupportedModem] = &[
    SupportedModem {
        vendor_id: "1bc7",
        product_id: "0021",
        vendor: "Telit",
        model: "HE910",
        technology: ModemTechnology::Hspa,
        capabilities: caps(true, true, true, false),
    },
    SupportedModem {
        vendor_id: "1bc7",
        product_id: "1010",
        vendor: "Telit",
        model: "DE910",
        technology: ModemTechnology::Evdo,
        capabilities: caps(false, true, false, true),
    },
    SupportedModem {
        vendor_id: "1bc7",
        product_id: "1201",
        vendor: "Telit",
        model: "LE910",
        technology: ModemTechnology::Lte,
        capabilities: caps(true, true, true, false),
    },
    SupportedModem {
        vendor_id: "1199",
        product_id: "6802",
        vendor: "Sierra Wireless",
        model: "MC8755",
        technology: ModemTechnology::Hspa,
        capabilities: caps(true, false, false, false),
    },
    SupportedModem {
        vendor_id: "1199",
        product_id: "6803",
        vendor: "Sierra Wireless",
        model: "MC8765",
        technology: ModemTechnology::Hspa,
        capabilities: caps(true, false, false, false),
    },
    SupportedModem {
        vendor_id: "1199",
        product_id: "6812",
        vendor: "Sierra Wireless",
        model: "MC8775",
        technology: ModemTechnology::Hspa,
        capabilities: caps(true, false, false, false),
    },
    SupportedModem {
        vendor_id: "2c7c",
        product_id: "0296",
        vendor: "Quectel",
        model: "BG96",
        technology: ModemTechnology::Lte,
        capabilities: caps(true, true, false, false),
    },
];

/// Look up a modem by USB id; ids compare case-insensitively.
pub fn lookup(vendor_id: &str, product_id: &str) -> Option<&'static SupportedModem> {
    SUPPORTED_MODEMS.iter().find(|m| {
        m.vendor_id.eq_ignore_ascii_case(vendor_id) && m.product_id.eq_ignore_ascii_case(product_id)
    })
}

pub fn lookup_usb(usb: &UsbDevice) -> Option<&'static SupportedModem> {
    lookup(&usb.vendor_id, &usb.product_id)
}
