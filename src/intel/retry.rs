//! Resilient remote invocation: exponential backoff on rate limiting only.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use tracing::warn;

use crate::intel::client::RemoteError;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 8_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 120_000;
pub const DEFAULT_JITTER_FACTOR: f64 = 0.1;

static RE_QUOTA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)resource_exhausted|429|quota").expect("static quota regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimited,
    Other,
}

/// Classify an error message: quota markers (RESOURCE_EXHAUSTED, 429, quota),
/// case-insensitive, mean rate limiting.
pub fn classify_message(msg: &str) -> ErrorClass {
    if RE_QUOTA.is_match(msg) {
        ErrorClass::RateLimited
    } else {
        ErrorClass::Other
    }
}

impl RemoteError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RemoteError::Status { status: 429, .. } => ErrorClass::RateLimited,
            RemoteError::Timeout(_) | RemoteError::MissingCredential | RemoteError::Disabled => {
                ErrorClass::Other
            }
            other => classify_message(&other.to_string()),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.class() == ErrorClass::RateLimited
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Relative jitter applied to each delay, 0.0 disables it.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Delay before retry number `attempt` (0-indexed): initial * 2^attempt,
    /// capped at `max_delay`, then jittered.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay.as_millis() as u64;
        let base = initial
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(self.max_delay.as_millis() as u64);

        // NaN or infinite factors disable jitter; random_range would panic on them.
        let jitter = if self.jitter_factor.is_finite() {
            self.jitter_factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if jitter == 0.0 {
            return Duration::from_millis(base);
        }
        let factor = 1.0 + rand::rng().random_range(-jitter..=jitter);
        Duration::from_millis((base as f64 * factor).max(0.0) as u64)
    }
}

/// Run `op` until it succeeds, fails with a non rate-limit error, or the
/// retry budget is spent. `op` receives the 0-indexed attempt number.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RemoteError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_rate_limited() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    target: "intel",
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "rate limited, backing off"
                );
                counter!("intel_retry_total").increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
