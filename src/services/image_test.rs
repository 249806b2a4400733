use std::time::Duration;

use super::*;
use crate::brand::test_helpers::{identity, png};
use crate::llm::types::{GenerateRequest, GenerateResponse, LlmError, ModelRole, OutputFormat};
use crate::quota::QUOTA_EXCEEDED_MESSAGE;
use crate::services::test_helpers::{MockModel, overloaded, rate_limited};

fn fast_policy() -> RetryPolicy {
    RetryPolicy { base_delay: Duration::ZERO, jitter: Duration::ZERO, ..RetryPolicy::default() }
}

fn image_reply() -> Result<GenerateResponse, LlmError> {
    Ok(GenerateResponse::from_image("image/png", vec![0x89, b'P', b'N', b'G']))
}

// =============================================================================
// generate_image
// =============================================================================

#[tokio::test]
async fn returns_image_bytes() {
    let llm = MockModel::new().with_image(image_reply());
    let quota = QuotaGuard::new();
    let img = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("a cake")).await.unwrap();
    assert_eq!(img, png(&[0x89, b'P', b'N', b'G']));

    let req = llm.last_request();
    assert_eq!(req.role, ModelRole::Image);
    assert_eq!(req.parts, vec![Part::Text("a cake".into())]);
    assert_eq!(req.output, OutputFormat::Image { aspect_ratio: AspectRatio::Square });
}

#[tokio::test]
async fn reference_is_attached_before_amended_text() {
    let llm = MockModel::new().with_image(image_reply());
    let quota = QuotaGuard::new();
    let request = ImageRequest::new("a cake box").with_reference(Some(png(b"logo")));
    generate_image(&llm, &fast_policy(), &quota, &request).await.unwrap();

    let req = llm.last_request();
    assert_eq!(req.parts.len(), 2);
    assert_eq!(req.parts[0], Part::Inline(InlineData { mime_type: "image/png".into(), data: b"logo".to_vec() }));
    assert_eq!(
        req.parts[1],
        Part::Text("a cake box. Use the provided image as the strict reference for the logo/brand symbol.".into())
    );
}

#[tokio::test]
async fn missing_image_part_is_no_image() {
    let llm = MockModel::new().with_image(Ok(GenerateResponse::from_text("I cannot draw that")));
    let quota = QuotaGuard::new();
    let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
    assert!(matches!(err, GenerationError::NoImage));
    assert!(!quota.is_blocked());
}

#[tokio::test]
async fn blocked_guard_makes_no_remote_call() {
    let llm = MockModel::new().with_image(image_reply());
    let quota = QuotaGuard::new();
    quota.trip();
    let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
    assert!(matches!(&err, GenerationError::QuotaExceeded { message, .. } if message == QUOTA_EXCEEDED_MESSAGE));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn rate_limit_is_not_retried_and_trips_guard() {
    let llm = MockModel::new().with_image(Err(rate_limited())).with_image(image_reply());
    let quota = QuotaGuard::new();
    let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
    assert!(err.is_quota());
    assert!(quota.is_blocked());
    assert_eq!(llm.calls(), 1);

    // Every later attempt short-circuits.
    for _ in 0..3 {
        let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
        assert!(err.is_quota());
    }
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn zero_limit_quota_carries_retry_after() {
    let body = r#"{"error":{"code":429,"message":"Quota exceeded for metric generate_content, limit: 0. Please retry in 12s."}}"#;
    let llm = MockModel::new().with_image(Err(LlmError::ApiResponse { status: 429, body: body.into() }));
    let quota = QuotaGuard::new();
    let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
    assert!(matches!(err, GenerationError::QuotaExceeded { retry_after: Some(d), .. } if d == Duration::from_secs(12)));
    assert!(quota.is_blocked());
}

#[tokio::test]
async fn overload_is_retried() {
    let llm = MockModel::new().with_image(Err(overloaded())).with_image(image_reply());
    let quota = QuotaGuard::new();
    generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap();
    assert_eq!(llm.calls(), 2);
    assert!(!quota.is_blocked());
}

/// Trips the shared guard on every call, as a concurrent slot hitting the
/// quota would, then answers from the scripted queue.
struct TripsGuard {
    quota: QuotaGuard,
    inner: MockModel,
}

#[async_trait::async_trait]
impl GenerativeModel for TripsGuard {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.quota.trip();
        self.inner.generate(request).await
    }
}

#[tokio::test]
async fn guard_tripped_during_backoff_stops_the_retry() {
    let quota = QuotaGuard::new();
    let llm = TripsGuard {
        quota: quota.clone(),
        inner: MockModel::new().with_image(Err(overloaded())).with_image(image_reply()),
    };
    let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
    assert!(matches!(&err, GenerationError::QuotaExceeded { message, .. } if message == QUOTA_EXCEEDED_MESSAGE));
    assert_eq!(llm.inner.calls(), 1);
}

#[tokio::test]
async fn fatal_error_does_not_trip_guard() {
    let llm = MockModel::new().with_image(Err(LlmError::ApiResponse { status: 400, body: "bad request".into() }));
    let quota = QuotaGuard::new();
    let err = generate_image(&llm, &fast_policy(), &quota, &ImageRequest::new("x")).await.unwrap_err();
    assert!(matches!(err, GenerationError::Llm(_)));
    assert!(!quota.is_blocked());
}

// =============================================================================
// prompts
// =============================================================================

#[test]
fn logo_prompt_names_company_and_style() {
    let prompt = logo_prompt(&identity("Product", 5000.0));
    assert_eq!(
        prompt,
        "A professional logo for \"Crumb & Bloom\". Style: hand-drawn wheat sprig inside a circle. \
         Minimalist, vector art, white background."
    );
}

#[test]
fn product_prompt_is_photography() {
    let prompt = offering_prompt(&identity("Product", 5000.0), 1, true).unwrap();
    assert!(prompt.starts_with("High-quality commercial photography of Garden Tier: a cake with pressed flowers."));
    assert!(prompt.contains("packaging"));
}

#[test]
fn service_prompt_evolves_the_logo() {
    let prompt = offering_prompt(&identity("Service", 5000.0), 0, true).unwrap();
    assert!(prompt.contains("evolution of the provided logo"));
    assert!(prompt.contains("\"Classic Tier\""));
    assert!(prompt.contains("Concept: a white two-tier cake."));
}

#[test]
fn offering_prompt_out_of_range() {
    assert!(offering_prompt(&identity("Product", 5000.0), 3, true).is_none());
}

#[test]
fn unreferenced_prompts_describe_the_logo() {
    let service = offering_prompt(&identity("Service", 5000.0), 0, false).unwrap();
    assert!(service.starts_with(
        "A highly detailed, 3D rendered evolution of the \"Crumb & Bloom\" logo (hand-drawn wheat sprig inside a circle)."
    ));
    assert!(!service.contains("provided logo"));

    let product = offering_prompt(&identity("Product", 5000.0), 2, false).unwrap();
    assert!(product.contains("Incorporate the \"Crumb & Bloom\" logo (hand-drawn wheat sprig inside a circle) naturally"));
    assert!(!product.contains("provided logo"));
}
