//! Bridge configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on a caller's wait for a result.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default maximum number of records the peer puts in one chunk.
pub const DEFAULT_MAX_CHUNK_RECORDS: usize = 1000;

/// Main bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a query waits for its result
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Peer-side batch size for search-by-id results
    pub max_chunk_records: usize,
    /// Interval of the pending-request expiry sweep
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Capacity of in-memory query/result channels
    pub event_buffer: usize,
    /// Logging configuration
    pub logging: LogConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_chunk_records: DEFAULT_MAX_CHUNK_RECORDS,
            sweep_interval: Duration::from_secs(30),
            event_buffer: 256,
            logging: LogConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "sweep_interval cannot be 0".into(),
            ));
        }

        if self.max_chunk_records == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_chunk_records cannot be 0".into(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidLimit("event_buffer cannot be 0".into()));
        }

        Ok(())
    }

    /// Parse configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
