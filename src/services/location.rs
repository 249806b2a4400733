//! Location validation: is the user's location a real place, and what is
//! its formal English name?
//!
//! Fails soft: a response without a usable payload is a negative verdict
//! that keeps the input, not an error. Transport errors that survive the
//! retry policy still propagate.

use serde_json::json;
use tracing::{debug, info, warn};

use super::{GenerationError, parse_payload};
use crate::brand::LocationValidation;
use crate::llm::types::{GenerateRequest, GenerativeModel};
use crate::retry::RetryPolicy;

pub async fn validate_location(
    llm: &dyn GenerativeModel,
    policy: &RetryPolicy,
    input: &str,
) -> Result<LocationValidation, GenerationError> {
    let request = GenerateRequest::json(build_location_prompt(input), location_schema());
    let response = policy.run(|| llm.generate(&request)).await?;

    let Some(payload) = response.payload() else {
        debug!(input, "location: empty payload; treating as invalid");
        return Ok(LocationValidation::rejected(input));
    };

    match parse_payload::<LocationValidation>("location", payload) {
        Ok(verdict) => {
            info!(input, valid = verdict.is_valid, normalized = %verdict.normalized_name, "location: checked");
            Ok(verdict)
        }
        Err(e) => {
            warn!(input, error = %e, "location: unparseable payload; treating as invalid");
            Ok(LocationValidation::rejected(input))
        }
    }
}

pub(crate) fn build_location_prompt(input: &str) -> String {
    format!(
        "Validate if the following location is a real, recognized place (city, state, or country).\n\
         Input: \"{input}\".\n\
         If it is real, return the formal English name (e.g., \"nyc\" -> \"New York, NY, USA\").\n\
         If it is fictional or nonsense (e.g., \"SnowTown\", \"Narnia\", \"Gothamburg\"), mark as invalid."
    )
}

pub(crate) fn location_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isValid": { "type": "BOOLEAN" },
            "normalizedName": { "type": "STRING" }
        },
        "required": ["isValid", "normalizedName"]
    })
}

#[cfg(test)]
#[path = "location_test.rs"]
mod tests;
