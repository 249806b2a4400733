//! Brand identity generation: name, slogan, palette, offerings and a
//! location-aware budget in one structured call.
//!
//! DESIGN
//! ======
//! The instruction asks the model to act as a financial analyst for the
//! stated location and budget. User overrides (name, slogan, colors) are
//! passed through as constraints; missing ones are generated. Three offerings
//! are requested but the count is not enforced here.
//!
//! ERROR HANDLING
//! ==============
//! No payload is a hard failure. A payload that misses required fields or
//! carries negative amounts is `Malformed`. The feasibility verdict is always
//! recomputed locally before the identity is returned.

use std::fmt::Write;

use serde_json::json;
use tracing::info;

use super::{GenerationError, parse_payload};
use crate::brand::{BrandIdentity, BusinessRequest};
use crate::feasibility;
use crate::llm::types::{GenerateRequest, GenerativeModel};
use crate::retry::RetryPolicy;

pub const OFFERING_COUNT: usize = 3;

pub async fn generate_brand_identity(
    llm: &dyn GenerativeModel,
    policy: &RetryPolicy,
    request: &BusinessRequest,
) -> Result<BrandIdentity, GenerationError> {
    info!(location = %request.location, budget = request.budget, currency = %request.currency, "identity: generating");
    let generate = GenerateRequest::json(build_identity_prompt(request), identity_schema());
    let response = policy.run(|| llm.generate(&generate)).await?;

    let payload = response
        .payload()
        .ok_or(GenerationError::EmptyResponse("brand identity"))?;
    let mut identity: BrandIdentity = parse_payload("brand identity", payload)?;
    identity
        .validate()
        .map_err(|detail| GenerationError::Malformed { what: "brand identity", detail })?;

    let remote_feasible = identity.budget_plan.is_feasible;
    feasibility::apply(&mut identity.budget_plan, request.budget);
    info!(
        company = %identity.company_name,
        business_type = ?identity.business_type,
        offerings = identity.products.len(),
        feasible = identity.budget_plan.is_feasible,
        remote_feasible,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "identity: ready"
    );
    Ok(identity)
}

pub(crate) fn build_identity_prompt(req: &BusinessRequest) -> String {
    let location = &req.location;
    let description = &req.description;
    let capital = format!("{} {}", req.budget, req.currency);

    let mut s = String::with_capacity(4096);
    s.push_str("Act as a brutally honest Senior Business Consultant and Financial Analyst.\n\n");
    let _ = writeln!(s, "The user wants to launch a business in: {location}.");
    let _ = writeln!(s, "The business concept is: \"{description}\".");
    let _ = writeln!(s, "Total available capital: {capital}.\n");

    s.push_str("User provided constraints:\n");
    match &req.existing_name {
        Some(name) => {
            let _ = writeln!(s, "- Use the Company Name: \"{name}\"");
        }
        None => s.push_str("- Generate a professional Company Name.\n"),
    }
    match &req.existing_slogan {
        Some(slogan) => {
            let _ = writeln!(s, "- Use the Slogan: \"{slogan}\"");
        }
        None => s.push_str("- Generate a memorable Slogan.\n"),
    }
    if req.color_preferences.is_empty() {
        s.push_str("- Generate a color palette suitable for the industry.\n");
    } else {
        let _ = writeln!(s, "- Incorporate these colors: {}", req.color_preferences.join(", "));
    }

    s.push_str(
        "\nTask 1: Brand Identity\n\
         Refine the concept, generate missing names/slogans.\n\
         IMPORTANT: For 'logoStyle', provide a visual description that can be used to generate a logo.\n\n",
    );

    s.push_str("Task 2: REALISTIC Location-Aware Budgeting & Projections\n");
    let _ = writeln!(s, "Create a detailed budget. You MUST analyze real-world costs in {location}.");
    s.push_str(
        "For each budget item, provide a 'searchQuery' that a user could paste into a search engine to find real listings.\n\
         Example: Item \"Retail Space Rent\", Search Query: \"commercial retail space for rent in [Location] under [Cost]\".\n",
    );
    let _ = writeln!(
        s,
        "Estimate 'estimatedMonthlyRevenue' based on market size in {location} for this niche."
    );
    s.push_str(
        "Calculate 'breakEvenMonths': how many months until cumulative profit covers 'totalOneTimeStartup'.\n",
    );
    let _ = writeln!(
        s,
        "CRITICAL FEASIBILITY CHECK: Is {capital} actually enough to start this specific business in {location}? \
         Report 'isFeasible', the 'suggestedMinimumBudget' and the 'missingBudget'.\n"
    );

    s.push_str("Task 3: Core Offerings (Products or Services)\n");
    let _ = writeln!(s, "Analyze the business concept ('{description}'). Determine 'businessType': 'Service' or 'Product'.");
    let _ = writeln!(
        s,
        "IF it is a SERVICE-BASED business (e.g., Gym, Tutoring, Consulting, Salon): generate {OFFERING_COUNT} \
         'Service Packages' or 'Membership Tiers'; 'visualPrompt' describes a visual representation of the service level."
    );
    let _ = writeln!(
        s,
        "IF it is a PRODUCT-BASED business (e.g., Bakery, Clothing Brand, Tech Store): generate {OFFERING_COUNT} \
         distinct physical products; 'visualPrompt' describes the product shot."
    );
    let _ = writeln!(s, "Assign a realistic 'price' for {location}.");
    s.push_str(
        "The 'visualPrompt' MUST instruct to place the company logo naturally in the scene (e.g., on a wall, on a card, on the packaging).\n",
    );
    s
}

pub(crate) fn identity_schema() -> serde_json::Value {
    let currencies: Vec<&str> = crate::brand::Currency::ALL
        .iter()
        .map(|c| c.code())
        .collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "companyName": { "type": "STRING" },
            "slogan": { "type": "STRING" },
            "description": { "type": "STRING", "description": "Executive summary" },
            "locationValid": { "type": "BOOLEAN" },
            "normalizedLocation": { "type": "STRING" },
            "businessType": { "type": "STRING", "enum": ["Service", "Product"] },
            "colorPalette": { "type": "ARRAY", "items": { "type": "STRING" } },
            "logoStyle": { "type": "STRING" },
            "products": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "price": { "type": "NUMBER" },
                        "visualPrompt": { "type": "STRING" }
                    },
                    "required": ["name", "description", "price", "visualPrompt"]
                }
            },
            "budgetPlan": {
                "type": "OBJECT",
                "properties": {
                    "items": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "category": { "type": "STRING" },
                                "item": { "type": "STRING" },
                                "cost": { "type": "NUMBER" },
                                "frequency": { "type": "STRING", "enum": ["One-time", "Monthly", "Yearly"] },
                                "reasoning": { "type": "STRING" },
                                "searchQuery": { "type": "STRING" }
                            },
                            "required": ["category", "item", "cost", "frequency", "reasoning", "searchQuery"]
                        }
                    },
                    "totalEstimatedMonthly": { "type": "NUMBER" },
                    "totalOneTimeStartup": { "type": "NUMBER" },
                    "estimatedMonthlyRevenue": { "type": "NUMBER" },
                    "breakEvenMonths": { "type": "NUMBER" },
                    "advice": { "type": "STRING" },
                    "currency": { "type": "STRING", "enum": currencies },
                    "isFeasible": { "type": "BOOLEAN" },
                    "suggestedMinimumBudget": { "type": "NUMBER" },
                    "missingBudget": { "type": "NUMBER" }
                },
                "required": [
                    "items", "totalEstimatedMonthly", "totalOneTimeStartup", "estimatedMonthlyRevenue",
                    "breakEvenMonths", "advice", "currency", "isFeasible", "suggestedMinimumBudget", "missingBudget"
                ]
            }
        },
        "required": [
            "companyName", "slogan", "description", "colorPalette", "products", "logoStyle",
            "budgetPlan", "locationValid", "normalizedLocation", "businessType"
        ]
    })
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
