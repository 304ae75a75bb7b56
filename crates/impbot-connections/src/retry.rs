//! Exponential backoff for reconnecting transports.

use std::time::Duration;

/// Retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries allowed before giving up. Successful reads reset the count.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Tracks consecutive failures against a [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    retry_count: u32,
    current_delay: Duration,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            retry_count: 0,
            current_delay,
        }
    }

    /// Forgets previous failures.
    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.current_delay = self.config.initial_delay;
    }

    /// Failures counted since the last reset.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Records a failure and returns how long to wait before retrying, or
    /// `None` once the retries are used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retry_count >= self.config.max_retries {
            return None;
        }
        let delay = self.current_delay;
        self.retry_count += 1;
        self.current_delay = std::cmp::min(
            Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.config.multiplier),
            self.config.max_delay,
        );
        Some(delay)
    }
}
