use std::time::Duration;

use rand::Rng as _;

/// Fixed-delay retry policy for transient failures.
///
/// The remote services checked here do not rate-limit retries, so there is no
/// exponential backoff: a short constant pause keeps a whole run fast.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts for one request, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(2000),
        }
    }
}

impl RetryConfig {
    /// Attempts actually made; a configured zero still sends the request once.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Delay inserted between two accounts of one batch.
///
/// Formula: `uniform(min_ms..=max_ms)`. A fixed delay is `min_ms == max_ms`.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 1000,
            max_ms: 3000,
        }
    }
}

impl PacingConfig {
    pub fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    pub fn next_delay(&self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        let ms = if lo == hi {
            lo
        } else {
            rand::thread_rng().gen_range(lo..=hi)
        };
        Duration::from_millis(ms)
    }
}
