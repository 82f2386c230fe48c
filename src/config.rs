// ABOUTME: Configuration loading and validation for the simfeed engine binary.
// ABOUTME: Reads environment variables with sensible defaults for the database path and batch cadence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SIMFEED_TURN_LIMIT is not a positive integer: {0}")]
    InvalidTurnLimit(String),

    #[error("SIMFEED_BATCH_INTERVAL_SECS is not a positive integer: {0}")]
    InvalidBatchInterval(String),
}

/// Engine configuration loaded from environment variables. The DeepSeek
/// credentials stay out of this struct; the model client reads its own
/// DEEPSEEK_* variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub turn_limit: u32,
    pub batch_interval_secs: u64,
}

impl EngineConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - SIMFEED_DB: sqlite database path (default: simfeed.db)
    /// - SIMFEED_TURN_LIMIT: turns per agent run (default: 10)
    /// - SIMFEED_BATCH_INTERVAL_SECS: seconds between batch triggers (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("SIMFEED_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("simfeed.db"));

        let turn_limit = match std::env::var("SIMFEED_TURN_LIMIT") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or(ConfigError::InvalidTurnLimit(raw))?,
            Err(_) => simfeed_agent::DEFAULT_TURN_LIMIT,
        };

        let batch_interval_secs = match std::env::var("SIMFEED_BATCH_INTERVAL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or(ConfigError::InvalidBatchInterval(raw))?,
            Err(_) => 300,
        };

        Ok(Self {
            db_path,
            turn_limit,
            batch_interval_secs,
        })
    }
}
