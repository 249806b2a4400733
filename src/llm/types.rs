//! LLM types: provider-neutral request/response shapes and errors.
//!
//! The remote capability is a single `generate` call: a list of input parts
//! (text and inline images) plus the requested output format (structured JSON
//! against a schema, or an image). `LlmError::kind` is the one place where raw
//! transport failures are translated into an [`ErrorKind`]; everything above
//! this module switches on the kind.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource exhaustion / rate limiting that may clear on its own.
    RateLimited,
    /// Hard quota: zero limit or an explicit "quota exceeded".
    QuotaExhausted,
    /// Service unavailable or overloaded.
    Unavailable,
    /// Everything else.
    Fatal,
}

impl ErrorKind {
    /// True for any signal that the caller's usage allowance is spent.
    #[must_use]
    pub fn is_quota_signal(self) -> bool {
        matches!(self, Self::RateLimited | Self::QuotaExhausted)
    }
}

impl LlmError {
    /// Translate this error into an [`ErrorKind`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ApiResponse { status, body } => classify_response(*status, body),
            _ => ErrorKind::Fatal,
        }
    }

    /// Retry-after hint embedded in the provider's error body, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ApiResponse { body, .. } => parse_retry_after(body),
            _ => None,
        }
    }
}

impl ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Unavailable)
    }
}

fn classify_response(status: u16, body: &str) -> ErrorKind {
    let lower = body.to_ascii_lowercase();
    if has_zero_limit(&lower) || lower.contains("quota exceeded") || lower.contains("exceeded your current quota") {
        return ErrorKind::QuotaExhausted;
    }
    if status == 429 || lower.contains("resource_exhausted") || lower.contains("rate limit") {
        return ErrorKind::RateLimited;
    }
    if status == 503 || lower.contains("\"unavailable\"") || lower.contains("overloaded") {
        return ErrorKind::Unavailable;
    }
    ErrorKind::Fatal
}

/// Matches `limit: 0` (message form) or `"quota_limit_value": "0"` (details form).
fn has_zero_limit(lower: &str) -> bool {
    const MARKERS: [&str; 2] = ["limit: ", "\"quota_limit_value\": \""];
    MARKERS.iter().any(|marker| {
        lower.match_indices(marker).any(|(idx, m)| {
            let rest = &lower[idx + m.len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            !digits.is_empty() && digits.parse::<f64>().is_ok_and(|n| n == 0.0)
        })
    })
}

/// Extract `Please retry in 37.5s` or `"retryDelay": "37s"`.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let lower = body.to_ascii_lowercase();
    for marker in ["retry in ", "\"retrydelay\": \"", "\"retrydelay\":\""] {
        if let Some(idx) = lower.find(marker) {
            let rest = &lower[idx + marker.len()..];
            let number: String = rest.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            let unit = &rest[number.len()..];
            if !unit.starts_with('s') {
                continue;
            }
            if let Ok(secs) = number.parse::<f64>() {
                if secs.is_finite() && secs >= 0.0 {
                    return Some(Duration::from_secs_f64(secs));
                }
            }
        }
    }
    None
}

// =============================================================================
// REQUEST
// =============================================================================

/// Which configured model a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Structured text generation (validation, identity).
    Text,
    /// Image generation.
    Image,
}

/// Inline binary payload (base64 on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A single input part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Inline(InlineData),
}

/// Supported image aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Tall => "9:16",
            Self::Wide => "16:9",
        }
    }
}

/// Requested output of a generate call.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    /// JSON conforming to the given response schema.
    Json { schema: serde_json::Value },
    /// A single image.
    Image { aspect_ratio: AspectRatio },
}

/// Provider-neutral generate request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub role: ModelRole,
    pub parts: Vec<Part>,
    pub output: OutputFormat,
}

impl GenerateRequest {
    /// Text-only request for schema-conformant JSON.
    #[must_use]
    pub fn json(prompt: impl Into<String>, schema: serde_json::Value) -> Self {
        Self { role: ModelRole::Text, parts: vec![Part::Text(prompt.into())], output: OutputFormat::Json { schema } }
    }

    /// Text instruction for the image model, no attachments.
    #[must_use]
    pub fn image(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            role: ModelRole::Image,
            parts: vec![Part::Text(prompt.into())],
            output: OutputFormat::Image { aspect_ratio },
        }
    }

    /// Concatenated text parts, mainly for logging and tests.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Inline(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Output of the first candidate, flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Concatenated text parts; `None` when the candidate had no text.
    pub text: Option<String>,
    /// First inline image part, if any.
    pub image: Option<InlineData>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl GenerateResponse {
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    #[must_use]
    pub fn from_image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self { image: Some(InlineData { mime_type: mime_type.into(), data }), ..Self::default() }
    }

    /// Non-blank text payload.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

// =============================================================================
// GENERATIVE MODEL TRAIT
// =============================================================================

/// Provider-neutral async trait for the remote capability. Enables mocking in tests.
#[async_trait::async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Send one generate request.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, the provider answers
    /// with a non-success status, or the envelope is malformed.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
