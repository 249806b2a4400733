//! Remote capability operations used by the session.
//!
//! ARCHITECTURE
//! ============
//! Each service module owns one capability: it builds the natural-language
//! instruction, runs the call under a [`RetryPolicy`](crate::retry::RetryPolicy)
//! and turns the structured response into a domain type. Failures are
//! reported as [`GenerationError`], which the session layer converts into
//! user-facing text.

pub mod identity;
pub mod image;
pub mod location;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::ErrorCode;
use crate::llm::types::{ErrorKind, LlmError};
use crate::retry::RetryClassify;

// =============================================================================
// ERROR
// =============================================================================

/// Generic text shown for a failed image slot.
pub const IMAGE_FAILURE_MESSAGE: &str = "Generation failed. Please retry.";

#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("no {0} returned by the model")]
    EmptyResponse(&'static str),
    #[error("malformed {what} response: {detail}")]
    Malformed { what: &'static str, detail: String },
    #[error("{message}")]
    QuotaExceeded { message: String, retry_after: Option<Duration> },
    #[error("no image generated")]
    NoImage,
}

impl ErrorCode for GenerationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Llm(_) => "E_LLM_ERROR",
            Self::EmptyResponse(_) => "E_EMPTY_RESPONSE",
            Self::Malformed { .. } => "E_MALFORMED_RESPONSE",
            Self::QuotaExceeded { .. } => "E_IMAGE_QUOTA_EXCEEDED",
            Self::NoImage => "E_NO_IMAGE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            Self::NoImage | Self::EmptyResponse(_) | Self::Malformed { .. } => true,
            Self::QuotaExceeded { .. } => false,
        }
    }
}

impl RetryClassify for GenerationError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Self::Llm(e) => e.kind(),
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExhausted,
            Self::EmptyResponse(_) | Self::Malformed { .. } | Self::NoImage => ErrorKind::Fatal,
        }
    }
}

impl GenerationError {
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Text safe to show in the interface.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::QuotaExceeded { message, retry_after: Some(wait) } => {
                format!("{message} Try again in about {}s.", wait.as_secs().max(1))
            }
            Self::QuotaExceeded { message, retry_after: None } => message.clone(),
            _ => IMAGE_FAILURE_MESSAGE.to_string(),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Deserialize a structured payload, mapping failures to `Malformed`.
fn parse_payload<T: DeserializeOwned>(what: &'static str, payload: &str) -> Result<T, GenerationError> {
    serde_json::from_str(payload).map_err(|e| GenerationError::Malformed { what, detail: e.to_string() })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(GenerationError::EmptyResponse("x").error_code(), "E_EMPTY_RESPONSE");
        assert_eq!(GenerationError::NoImage.error_code(), "E_NO_IMAGE");
        assert_eq!(
            GenerationError::QuotaExceeded { message: "q".into(), retry_after: None }.error_code(),
            "E_IMAGE_QUOTA_EXCEEDED"
        );
    }

    #[test]
    fn quota_is_not_retryable() {
        let err = GenerationError::QuotaExceeded { message: "q".into(), retry_after: None };
        assert!(!err.retryable());
        assert!(err.is_quota());
        assert!(GenerationError::NoImage.retryable());
    }

    #[test]
    fn retry_classification() {
        let quota = GenerationError::QuotaExceeded { message: "q".into(), retry_after: None };
        assert_eq!(quota.error_kind(), ErrorKind::QuotaExhausted);
        let overloaded = GenerationError::Llm(test_helpers::overloaded());
        assert_eq!(overloaded.error_kind(), ErrorKind::Unavailable);
        assert_eq!(GenerationError::NoImage.error_kind(), ErrorKind::Fatal);
    }

    #[test]
    fn user_message_hides_internal_details() {
        let err = GenerationError::Llm(LlmError::ApiResponse { status: 500, body: "stack trace".into() });
        assert_eq!(err.user_message(), IMAGE_FAILURE_MESSAGE);
        assert!(!err.user_message().contains("stack"));
    }

    #[test]
    fn user_message_includes_retry_after() {
        let err = GenerationError::QuotaExceeded { message: "Quota gone.".into(), retry_after: Some(Duration::from_secs(42)) };
        assert_eq!(err.user_message(), "Quota gone. Try again in about 42s.");
    }

    #[test]
    fn parse_payload_reports_malformed() {
        let err = parse_payload::<crate::brand::LocationValidation>("location", "{\"isValid\":1}").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed { what: "location", .. }));
    }
}
