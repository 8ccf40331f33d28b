//! Publish and scheduler configuration.

use std::time::Duration;

use serde::Deserialize;

/// Retry budget for applying manifest operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Retries after the first attempt, per operation.
    pub max_retries: usize,
    /// First backoff delay.
    pub min_delay_ms: u64,
    /// Backoff cap.
    pub max_delay_ms: u64,
    /// Bound on a single attempt of a single operation.
    pub operation_timeout_secs: u64,
    /// Randomize backoff delays.
    pub jitter: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay_ms: 100,
            max_delay_ms: 2000,
            operation_timeout_secs: 30,
            jitter: true,
        }
    }
}

impl PublishConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Publish scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Seconds between scheduler ticks.
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
