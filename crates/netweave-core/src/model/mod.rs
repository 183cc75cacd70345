pub mod common;
pub mod dhcp;
pub mod firewall;
pub mod interface;
pub mod ip;
pub mod modem;
pub mod net_config;
pub mod network;
pub mod wifi;

pub use common::Secret;
pub use dhcp::DhcpServerConfig4;
pub use firewall::{
    AddressFamily, FirewallAutoNatConfig, FirewallConfiguration, InterfaceRestriction, NatRule,
    OpenPortRule, PortForwardRule, PortSpec, Protocol,
};
pub use interface::{InterfaceAddressConfig, InterfaceConfig, InterfaceKind, ModemIdentity, UsbDevice};
pub use ip::{NetConfigIp4, NetConfigIp6, NetInterfaceStatus};
pub use modem::{
    ModemAuthType, ModemConfig, ModemConnectionStatus, ModemConnectionType, ModemPdpType,
};
pub use net_config::{NetConfig, NetConfigKind};
pub use network::NetworkConfiguration;
pub use wifi::{
    BgscanModule, WifiBgscan, WifiCiphers, WifiConfig, WifiMode, WifiRadioMode, WifiSecurity,
};
