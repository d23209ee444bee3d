use std::time::Duration;

use crate::config::Config;
use crate::infrastructure::ops;

/// How often and how patiently a job is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_attempts, config.retry_backoff())
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Per-operation time limits for bridge calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub wait: Duration,
    pub script: Duration,
}

impl Timeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            navigation: Duration::from_millis(config.navigation_timeout_ms),
            wait: Duration::from_millis(config.wait_timeout_ms),
            script: Duration::from_millis(config.script_timeout_ms),
        }
    }

    pub fn for_operation(&self, operation: &str) -> Duration {
        match operation {
            ops::NAVIGATE => self.navigation,
            ops::WAIT_FOR => self.wait,
            _ => self.script,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
