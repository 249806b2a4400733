//! Image generation for the logo and offering slots.
//!
//! DESIGN
//! ======
//! Every attempt, retries included, passes the session's [`QuotaGuard`]
//! first, so a latch tripped by another slot during a backoff stops this one
//! before it reaches the network. Rate-limit signals are not retried here: on
//! a quota-limited key a retry only burns the remaining allowance, so they
//! surface at once and trip the guard.
//!
//! A reference image, when given, is sent as an inline part ahead of the
//! text so the model anchors the brand mark on it.

use tracing::{debug, info};

use super::GenerationError;
use crate::brand::{BrandIdentity, BusinessType, GeneratedImage};
use crate::llm::types::{AspectRatio, GenerateRequest, GenerativeModel, InlineData, Part};
use crate::quota::QuotaGuard;
use crate::retry::RetryPolicy;

/// Suffix appended to the instruction when a reference image is attached.
pub const REFERENCE_SUFFIX: &str = "Use the provided image as the strict reference for the logo/brand symbol.";

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub reference: Option<GeneratedImage>,
}

impl ImageRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), aspect_ratio: AspectRatio::default(), reference: None }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: Option<GeneratedImage>) -> Self {
        self.reference = reference;
        self
    }

    fn to_generate_request(&self) -> GenerateRequest {
        match &self.reference {
            None => GenerateRequest::image(self.prompt.clone(), self.aspect_ratio),
            Some(reference) => {
                let mut request = GenerateRequest::image(format!("{}. {REFERENCE_SUFFIX}", self.prompt), self.aspect_ratio);
                request.parts.insert(
                    0,
                    Part::Inline(InlineData { mime_type: reference.mime_type.clone(), data: reference.data.clone() }),
                );
                request
            }
        }
    }
}

/// Generate one image under the session quota guard.
///
/// # Errors
///
/// - [`GenerationError::QuotaExceeded`] when the guard is tripped before any
///   attempt (no remote call) or the provider reports exhaustion (guard
///   tripped first)
/// - [`GenerationError::NoImage`] when the response carries no image part
/// - [`GenerationError::Llm`] for other transport failures after retries
pub async fn generate_image(
    llm: &dyn GenerativeModel,
    policy: &RetryPolicy,
    quota: &QuotaGuard,
    request: &ImageRequest,
) -> Result<GeneratedImage, GenerationError> {
    let generate = &request.to_generate_request();
    let policy = policy.without_resource_exhausted();
    let response = policy
        .run(move || async move {
            if let Err(e) = quota.check() {
                debug!("image: quota guard blocked attempt");
                return Err(e);
            }
            llm.generate(generate).await.map_err(|e| quota.observe(e))
        })
        .await?;

    let inline = response.image.ok_or(GenerationError::NoImage)?;
    info!(
        mime_type = %inline.mime_type,
        bytes = inline.data.len(),
        referenced = request.reference.is_some(),
        "image: generated"
    );
    Ok(GeneratedImage { data: inline.data, mime_type: inline.mime_type })
}

// =============================================================================
// PROMPTS
// =============================================================================

#[must_use]
pub fn logo_prompt(identity: &BrandIdentity) -> String {
    format!(
        "A professional logo for \"{}\". Style: {}. Minimalist, vector art, white background.",
        identity.company_name, identity.logo_style
    )
}

/// Instruction for offering `index`. `None` when the index is out of range.
///
/// `referenced` says whether the logo image is attached. Without it the
/// brand mark is described from the identity instead.
#[must_use]
pub fn offering_prompt(identity: &BrandIdentity, index: usize, referenced: bool) -> Option<String> {
    let product = identity.products.get(index)?;
    let logo = if referenced {
        "the provided logo".to_string()
    } else {
        format!("the \"{}\" logo ({})", identity.company_name, identity.logo_style)
    };
    let prompt = match identity.business_type {
        BusinessType::Service => format!(
            "A highly detailed, 3D rendered evolution of {logo}. \
             The logo is transforming into a representation of \"{}\". \
             Concept: {}. \
             Style: glassmorphism, intricate texture, glowing edges, cinematic lighting. \
             The shape should resemble the original logo but be significantly more complex and premium.",
            product.name, product.visual_prompt
        ),
        BusinessType::Product => format!(
            "High-quality commercial photography of {}: {}. \
             Cinematic lighting, photorealistic, commercial style. \
             Incorporate {logo} naturally into the scene (e.g. on the product packaging or label).",
            product.name, product.visual_prompt
        ),
    };
    Some(prompt)
}

#[cfg(test)]
#[path = "image_test.rs"]
mod tests;
