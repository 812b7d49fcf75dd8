//! Session client configuration.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Allowance, AuthRequestParams};
use std::time::Duration;

/// Default broker endpoint.
pub const DEFAULT_BROKER_URL: &str = "wss://clearnet.yellow.com/ws";

/// Growth factor of the reconnect delay.
pub const RECONNECT_FACTOR: f64 = 1.5;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the broker
    pub broker_url: String,
    /// Authentication handshake
    pub auth: AuthConfig,
    /// Request correlation
    pub requests: RequestConfig,
    /// Reconnection after unclean disconnects
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            auth: AuthConfig::default(),
            requests: RequestConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_url.trim().is_empty() {
            return Err(ConfigError::InvalidUrl("broker_url cannot be empty".into()));
        }
        if !(self.broker_url.starts_with("ws://")
            || self.broker_url.starts_with("wss://")
            || self.broker_url.starts_with("memory://"))
        {
            return Err(ConfigError::InvalidUrl(format!(
                "unsupported scheme in {}",
                self.broker_url
            )));
        }

        if self.auth.app_name.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.app_name cannot be empty".into()));
        }
        if self.auth.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("auth.timeout cannot be 0".into()));
        }
        if self.requests.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "requests.timeout cannot be 0".into(),
            ));
        }
        if self.requests.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "requests.channel_capacity cannot be 0".into(),
            ));
        }

        if self.reconnect.enabled {
            if self.reconnect.base_delay.is_zero() {
                return Err(ConfigError::InvalidReconnect(
                    "base_delay cannot be 0".into(),
                ));
            }
            if self.reconnect.max_attempts == 0 {
                return Err(ConfigError::InvalidReconnect(
                    "max_attempts cannot be 0 when reconnect is enabled".into(),
                ));
            }
            if !(self.reconnect.factor.is_finite() && self.reconnect.factor >= 1.0) {
                return Err(ConfigError::InvalidReconnect(
                    "factor must be a finite number >= 1".into(),
                ));
            }
        }

        Ok(())
    }

    /// Parameters of the `auth_request` this configuration declares.
    pub fn auth_params(&self) -> AuthRequestParams {
        AuthRequestParams {
            wallet: self.auth.wallet,
            participant: self.auth.participant,
            app_name: self.auth.app_name.clone(),
            allowances: self.auth.allowances.clone(),
            expire: self.auth.expire.clone(),
            scope: self.auth.scope.clone(),
            application: self.auth.application,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Application name, also the EIP-712 domain name
    pub app_name: String,
    /// Identity (wallet) address answering the challenge
    pub wallet: Address,
    /// Session key address signing subsequent requests
    pub participant: Address,
    /// Declared spending allowances
    pub allowances: Vec<Allowance>,
    pub scope: Option<String>,
    pub application: Option<Address>,
    /// Expiry in unix seconds
    pub expire: Option<String>,
    /// Window for the whole handshake (default: 15s)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Present a stored JWT on reconnect instead of a fresh handshake
    pub resume_with_jwt: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_name: "state-channel-client".to_string(),
            wallet: Address::ZERO,
            participant: Address::ZERO,
            allowances: Vec::new(),
            scope: None,
            application: None,
            expire: None,
            timeout: Duration::from_secs(15),
            resume_with_jwt: true,
        }
    }
}

/// Request correlation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Per-request timeout (default: 30s)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Capacity of command and notification channels
    pub channel_capacity: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            channel_capacity: 256,
        }
    }
}

/// Reconnection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Delay before the first reconnect (default: 1s)
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Delay growth per attempt (default: 1.5)
    pub factor: f64,
    /// Reconnects before giving up (default: 5)
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_secs(1),
            factor: RECONNECT_FACTOR,
            max_attempts: 5,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Missing or unusable broker URL
    #[error("invalid broker url: {0}")]
    InvalidUrl(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid reconnect settings
    #[error("invalid reconnect policy: {0}")]
    InvalidReconnect(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map_err(|_| "invalid minutes")?
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or("minutes out of range")
        } else {
            // Plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
