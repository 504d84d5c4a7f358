//! Reconnection policy
//!
//! OKEx connections are re-established at a fixed interval rather than with
//! backoff: the endpoint is a single load-balanced host and quick recovery
//! matters more than spreading retries.

use std::time::Duration;

/// Policy for re-establishing a dropped connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay between a failure and the next connection attempt
    pub interval: Duration,
    /// Give up after this many consecutive connect failures (None = never)
    pub max_failures: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_failures: None,
        }
    }
}

impl ReconnectPolicy {
    /// Create a new policy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound the number of consecutive failures
    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_failures = Some(max);
        self
    }

    /// Give up on the first failure
    pub fn disabled() -> Self {
        Self {
            max_failures: Some(1),
            ..Default::default()
        }
    }

    /// Check if another attempt is allowed after `failures` consecutive
    /// failures
    pub fn should_retry(&self, failures: u32) -> bool {
        match self.max_failures {
            Some(max) => failures < max,
            None => true,
        }
    }
}
