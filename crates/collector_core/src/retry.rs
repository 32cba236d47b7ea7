use std::time::Duration;

/// How a rate-limited request is retried.
///
/// `max_attempts` counts requests, including the first one. `None` retries
/// until the upstream stops answering 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub cooldown: Duration,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            cooldown,
        }
    }

    pub fn unbounded(cooldown: Duration) -> Self {
        Self {
            max_attempts: None,
            cooldown,
        }
    }

    /// Whether another request may be issued after `attempts_made` requests
    /// were rate limited.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts_made < max,
            None => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(3, Duration::from_secs(300))
    }
}
