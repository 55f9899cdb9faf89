use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::Level;

pub mod broadcaster;
pub mod defaults;
pub mod server;
pub mod session;

/// Configuration for a table server. Every field may be omitted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_server_name")]
    pub server_name: String,
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,
    #[serde(default = "default_offer_interval_ms")]
    pub offer_interval_ms: u64,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            bind: default_bind(),
            port: default_port(),
            discovery_port: default_discovery_port(),
            broadcast_address: default_broadcast_address(),
            offer_interval_ms: default_offer_interval_ms(),
            session_timeout_ms: default_session_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("server_name must not be empty")]
    EmptyServerName,
}

#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub server_name: String,
    pub listen: SocketAddr,
    /// Where offers are sent.
    pub broadcast: SocketAddr,
    pub offer_interval: Duration,
    pub session_timeout: Duration,
    pub log_level: Level,
}

fn default_server_name() -> String {
    defaults::DEFAULT_SERVER_NAME.to_string()
}

fn default_bind() -> IpAddr {
    defaults::DEFAULT_BIND
}

fn default_port() -> u16 {
    defaults::DEFAULT_PORT
}

fn default_discovery_port() -> u16 {
    defaults::DEFAULT_DISCOVERY_PORT
}

fn default_broadcast_address() -> Ipv4Addr {
    defaults::DEFAULT_BROADCAST_ADDRESS
}

fn default_offer_interval_ms() -> u64 {
    defaults::DEFAULT_OFFER_INTERVAL_MS
}

fn default_session_timeout_ms() -> u64 {
    defaults::DEFAULT_SESSION_TIMEOUT_MS
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn nonzero_millis(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(Duration::from_millis(value))
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::EmptyServerName);
        }
        if self.discovery_port == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "discovery_port",
                value: 0,
            });
        }
        let offer_interval = nonzero_millis("offer_interval_ms", self.offer_interval_ms)?;
        let session_timeout = nonzero_millis("session_timeout_ms", self.session_timeout_ms)?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        Ok(ValidatedConfig {
            server_name: self.server_name,
            listen: SocketAddr::new(self.bind, self.port),
            broadcast: SocketAddr::from((self.broadcast_address, self.discovery_port)),
            offer_interval,
            session_timeout,
            log_level,
        })
    }
}
