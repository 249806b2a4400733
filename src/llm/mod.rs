//! LLM: adapter for the generative capability behind brand generation.
//!
//! DESIGN
//! ======
//! Environment-configured, like the rest of the crate. `LlmClient` owns one
//! Gemini HTTP client and routes each request to the text or image model by
//! its [`ModelRole`](types::ModelRole). Everything above this module talks to
//! the [`GenerativeModel`] trait so tests can swap in scripted mocks.

pub mod config;
pub mod gemini;
pub mod types;

use config::LlmConfig;
pub use types::GenerativeModel;
use types::{GenerateRequest, GenerateResponse, LlmError, ModelRole};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete client for the Gemini API.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: gemini::GeminiClient,
    text_model: String,
    image_model: String,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = gemini::GeminiClient::new(config.api_key, config.base_url, config.timeouts)?;
        Ok(Self { inner, text_model: config.text_model, image_model: config.image_model })
    }

    /// Model used for structured text requests.
    #[must_use]
    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    /// Model used for image requests.
    #[must_use]
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn model_for(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Text => &self.text_model,
            ModelRole::Image => &self.image_model,
        }
    }
}

#[async_trait::async_trait]
impl GenerativeModel for LlmClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.inner
            .generate(self.model_for(request.role), request)
            .await
    }
}
