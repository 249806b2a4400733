//! Session-scoped image quota latch.
//!
//! DESIGN
//! ======
//! Image generation is quota-limited per API key. Once the provider reports
//! exhaustion, every further attempt is guaranteed to fail, so the guard
//! latches and short-circuits later attempts before they reach the network
//! or the retry loop. The latch is never cleared; a new `Session` starts with
//! a fresh guard.
//!
//! The guard is cheap to clone and shared by every image slot of one session.
//! `observe` trips the latch before handing the error back, so any attempt
//! started after the failing one already sees it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::llm::types::LlmError;
use crate::services::GenerationError;

/// Fixed user-facing text for quota exhaustion.
pub const QUOTA_EXCEEDED_MESSAGE: &str = "Image quota exceeded for this API key. Enable billing or wait for reset.";

#[derive(Debug, Clone, Default)]
pub struct QuotaGuard {
    blocked: Arc<AtomicBool>,
}

impl QuotaGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Fail fast when the latch is set.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::QuotaExceeded`] with the fixed message once blocked.
    pub fn check(&self) -> Result<(), GenerationError> {
        if self.is_blocked() {
            return Err(GenerationError::QuotaExceeded { message: QUOTA_EXCEEDED_MESSAGE.to_string(), retry_after: None });
        }
        Ok(())
    }

    /// Set the latch. Returns `true` if this call flipped it.
    pub fn trip(&self) -> bool {
        let flipped = !self.blocked.swap(true, Ordering::AcqRel);
        if flipped {
            warn!("image quota exhausted; blocking further image requests for this session");
        }
        flipped
    }

    /// Map a remote image failure, tripping the latch on quota signals.
    #[must_use]
    pub fn observe(&self, err: LlmError) -> GenerationError {
        if err.kind().is_quota_signal() {
            self.trip();
            return GenerationError::QuotaExceeded {
                message: QUOTA_EXCEEDED_MESSAGE.to_string(),
                retry_after: err.retry_after(),
            };
        }
        GenerationError::Llm(err)
    }
}

#[cfg(test)]
#[path = "quota_test.rs"]
mod tests;
