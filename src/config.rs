use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::task::MAX_ABSOLUTE_TIMEOUT_SECS;

/// Tunable limits for the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pending tasks beyond this are rejected instead of queued.
    pub max_queue_size: usize,
    /// Ticks a retried task waits in the queue before its first attempt.
    pub base_retry_delay_ticks: u64,
    /// Multiplier applied to the retry delay for each further attempt.
    pub retry_backoff_multiplier: f64,
    /// Wall clock ceiling in seconds for any task the scheduler wraps.
    pub absolute_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            base_retry_delay_ticks: 2,
            retry_backoff_multiplier: 2.0,
            absolute_timeout_secs: MAX_ABSOLUTE_TIMEOUT_SECS,
        }
    }
}

impl SchedulerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| SchedulerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.max_queue_size == 0 {
            errors.push("max_queue_size must be greater than 0");
        }
        if self.base_retry_delay_ticks == 0 {
            errors.push("base_retry_delay_ticks must be greater than 0");
        }
        if self.retry_backoff_multiplier < 1.0 {
            errors.push("retry_backoff_multiplier must be at least 1.0");
        }
        if self.absolute_timeout_secs == 0 {
            errors.push("absolute_timeout_secs must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::Config(errors.join("; ")))
        }
    }

    pub fn absolute_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.absolute_timeout_secs)
    }
}
