//! Reconnect timing

use std::time::Duration;

use mqbridge_core::config::ReconnectConfig;

/// Connect and reconnect timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Per-attempt connect timeout, delay between initial attempts, and first
    /// reconnect backoff
    pub initial: Duration,
    /// Reconnect backoff ceiling
    pub max_delay: Duration,
    /// Failed initial attempts tolerated before giving up
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            initial: Duration::from_secs(config.initial),
            max_delay: Duration::from_secs(config.max_delay),
            max_retries: config.max_retries,
        }
    }
}

/// Doubling backoff capped at the policy's `max_delay`
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max_delay: Duration,
    next: Duration,
}

impl Backoff {
    /// Backoff starting at `policy.initial`
    pub fn new(policy: &ReconnectPolicy) -> Self {
        let initial = policy.initial.min(policy.max_delay);
        Self {
            initial,
            max_delay: policy.max_delay,
            next: initial,
        }
    }

    /// Delay before the next attempt; doubles the following one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.max_delay);
        delay
    }

    /// Start over from the initial delay
    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}
