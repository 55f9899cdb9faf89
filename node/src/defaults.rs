//! Defaults for every [crate::Config] field.

use leafjack_types::OFFER_PORT;
use std::net::{IpAddr, Ipv4Addr};

pub const DEFAULT_SERVER_NAME: &str = "🍃 Leaf Village Casino 🍃";
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
/// Zero lets the OS pick; the chosen port is what offers advertise.
pub const DEFAULT_PORT: u16 = 0;
pub const DEFAULT_DISCOVERY_PORT: u16 = OFFER_PORT;
pub const DEFAULT_BROADCAST_ADDRESS: Ipv4Addr = Ipv4Addr::BROADCAST;
pub const DEFAULT_OFFER_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
