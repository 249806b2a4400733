//! Bounded exponential-backoff retry for remote calls.
//!
//! DESIGN
//! ======
//! `RetryPolicy::run` invokes an async operation up to `attempts` times.
//! Only failures whose [`ErrorKind`] is transient are retried:
//! - `Unavailable` always
//! - `RateLimited` only when `allow_resource_exhausted` is set
//! - `QuotaExhausted` and `Fatal` never
//!
//! Delay before retry `i` (0-based) is `base_delay * 2^i` plus a uniform
//! jitter in `0..=jitter`, so concurrent callers do not retry in lockstep.
//! Backoff only strictly increases while `jitter < base_delay`; `from_env`
//! clamps the jitter accordingly. The last error is returned unchanged.
//!
//! Any error type that can report an [`ErrorKind`] can be retried, so callers
//! may gate each attempt (e.g. on the quota latch) inside the operation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::llm::config::env_parse;
use crate::llm::types::{ErrorKind, LlmError};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 800;
pub const DEFAULT_RETRY_JITTER_MS: u64 = 200;

/// Errors the retry loop can classify.
pub trait RetryClassify: Display {
    fn error_kind(&self) -> ErrorKind;
}

impl RetryClassify for LlmError {
    fn error_kind(&self) -> ErrorKind {
        self.kind()
    }
}

/// Retry settings for one class of remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of invocations, including the first.
    pub attempts: u32,
    /// Delay before the first retry; doubles for each subsequent one.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub jitter: Duration,
    /// Whether rate-limit / resource-exhaustion failures are retried.
    pub allow_resource_exhausted: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            jitter: Duration::from_millis(DEFAULT_RETRY_JITTER_MS),
            allow_resource_exhausted: true,
        }
    }
}

impl RetryPolicy {
    /// Defaults overridden by `RETRY_ATTEMPTS`, `RETRY_BASE_DELAY_MS` and `RETRY_JITTER_MS`.
    ///
    /// The jitter is clamped below the base delay.
    #[must_use]
    pub fn from_env() -> Self {
        let base_ms = env_parse("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS);
        let jitter_ms = env_parse("RETRY_JITTER_MS", DEFAULT_RETRY_JITTER_MS).min(base_ms.saturating_sub(1));
        Self {
            attempts: env_parse("RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS).max(1),
            base_delay: Duration::from_millis(base_ms),
            jitter: Duration::from_millis(jitter_ms),
            allow_resource_exhausted: true,
        }
    }

    /// Same policy, but rate-limit signals fail fast. Used for image calls.
    #[must_use]
    pub fn without_resource_exhausted(self) -> Self {
        Self { allow_resource_exhausted: false, ..self }
    }

    /// Whether a failure of this kind should be retried under this policy.
    #[must_use]
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        match kind {
            ErrorKind::Unavailable => true,
            ErrorKind::RateLimited => self.allow_resource_exhausted,
            ErrorKind::QuotaExhausted | ErrorKind::Fatal => false,
        }
    }

    /// Deterministic part of the delay before retry `attempt_index` (0-based).
    #[must_use]
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    fn delay_with_jitter(&self, attempt_index: u32) -> Duration {
        let max_jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = if max_jitter_ms == 0 { 0 } else { rand::rng().random_range(0..=max_jitter_ms) };
        self.backoff(attempt_index)
            .saturating_add(Duration::from_millis(jitter_ms))
    }

    /// Run `op` under this policy.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once all
    /// attempts are spent.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: RetryClassify,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt_index = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let kind = e.error_kind();
                    let remaining = attempt_index + 1 < attempts;
                    if !remaining || !self.is_retryable(kind) {
                        debug!(error = %e, ?kind, attempt = attempt_index + 1, "retry: giving up");
                        return Err(e);
                    }
                    let delay = self.delay_with_jitter(attempt_index);
                    warn!(
                        error = %e,
                        ?kind,
                        attempt = attempt_index + 1,
                        total = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "remote call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt_index += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
