//! Error codes shared by every layer.
//!
//! Each error enum in the crate maps to a stable, grepable `E_*` code and a
//! retryable hint. The session layer uses both when it turns a failure into
//! user-facing state; raw error values never cross that boundary.

/// Stable code + retry hint for an error type.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
