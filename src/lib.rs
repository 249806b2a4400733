//! brandforge: turns a business description, a location and a budget into a
//! brand package: identity, palette, logo, offerings and a startup budget.
//!
//! ARCHITECTURE
//! ============
//! Leaf-first:
//! - `llm`: Gemini transport behind the mockable `GenerativeModel` trait
//! - `retry`, `quota`: retry policy and the session image-quota latch
//! - `services`: location check, brand identity and image generation
//! - `feasibility`, `budget`: local budget corrections and derived views
//! - `session`: generation-cycle state machine over all of the above

pub mod brand;
pub mod budget;
pub mod error;
pub mod feasibility;
pub mod llm;
pub mod quota;
pub mod retry;
pub mod services;
pub mod session;
