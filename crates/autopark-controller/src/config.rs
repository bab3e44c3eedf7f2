use std::time::Duration;

use serde::{Deserialize, Serialize};

use autopark_core::constants::{
    DEFAULT_BUZZER_DURATION_MS, DEFAULT_CAPACITY, DEFAULT_COMMAND_ATTEMPTS,
    DEFAULT_EVENT_QUEUE_DEPTH, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RECOGNITION_ATTEMPTS,
    DEFAULT_RECOGNITION_RETRY_DELAY_MS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_SETTLE_DELAY_MS,
};

use crate::error::{ControllerError, Result};

/// `controller` configuration section. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Total parking slots.
    pub capacity: u32,
    /// Time between opening a gate and closing it again.
    pub settle_delay_ms: u64,
    pub buzzer_duration_ms: u64,
    /// Total attempts per gate command, first one included.
    pub command_attempts: u32,
    /// Backoff before the second attempt; doubles each retry.
    pub retry_backoff_ms: u64,
    /// Total recognition attempts per plate event, first one included.
    pub recognition_attempts: u32,
    pub recognition_retry_delay_ms: u64,
    pub poll_interval_ms: u64,
    /// Events queued per gate while a workflow runs.
    pub event_queue_depth: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            buzzer_duration_ms: DEFAULT_BUZZER_DURATION_MS,
            command_attempts: DEFAULT_COMMAND_ATTEMPTS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            recognition_attempts: DEFAULT_RECOGNITION_ATTEMPTS,
            recognition_retry_delay_ms: DEFAULT_RECOGNITION_RETRY_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            event_queue_depth: DEFAULT_EVENT_QUEUE_DEPTH,
        }
    }
}

impl ControllerConfig {
    /// # Errors
    /// Rejects values the workflows cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ControllerError::config("capacity must be at least 1"));
        }
        if self.command_attempts == 0 {
            return Err(ControllerError::config("command_attempts must be at least 1"));
        }
        if self.recognition_attempts == 0 {
            return Err(ControllerError::config(
                "recognition_attempts must be at least 1",
            ));
        }
        if self.event_queue_depth == 0 {
            return Err(ControllerError::config("event_queue_depth must be at least 1"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ControllerError::config("poll_interval_ms must be at least 1"));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn buzzer_duration(&self) -> Duration {
        Duration::from_millis(self.buzzer_duration_ms)
    }

    pub fn recognition_retry_delay(&self) -> Duration {
        Duration::from_millis(self.recognition_retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Backoff before attempt `attempt` (1-based; attempt 1 has none).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64.checked_shl(attempt - 2).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.capacity, 1);
        assert_eq!(config.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.buzzer_duration(), Duration::from_secs(3));
        assert_eq!(config.recognition_attempts, 2);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(1, 0)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    fn test_backoff_doubles(#[case] attempt: u32, #[case] millis: u64) {
        let config = ControllerConfig::default();
        assert_eq!(config.backoff_before(attempt), Duration::from_millis(millis));
    }

    #[rstest]
    #[case("capacity: 0")]
    #[case("command_attempts: 0")]
    #[case("recognition_attempts: 0")]
    #[case("event_queue_depth: 0")]
    fn test_invalid_values(#[case] yaml: &str) {
        let config: ControllerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ControllerError::Config { .. })));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ControllerConfig = serde_yaml::from_str("capacity: 4\nsettle_delay_ms: 1500").unwrap();
        assert_eq!(config.capacity, 4);
        assert_eq!(config.settle_delay(), Duration::from_millis(1500));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }
}
