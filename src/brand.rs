//! Brand package data model.
//!
//! DESIGN
//! ======
//! Two kinds of types live here:
//! - input: `BusinessForm` (editable form state) and `BusinessRequest`
//!   (validated, immutable input for one generation cycle)
//! - output: the structured payloads returned by the remote model. Their
//!   serde shape is the response contract: camelCase field names, every
//!   field required unless marked `Option`. A payload missing a required
//!   field fails deserialization and is reported as malformed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ErrorCode;

pub const DEFAULT_BUDGET: f64 = 1000.0;

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "BAM")]
    Bam,
    #[serde(rename = "RSD")]
    Rsd,
    #[serde(rename = "GBP")]
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 5] = [Self::Usd, Self::Eur, Self::Bam, Self::Rsd, Self::Gbp];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Bam => "BAM",
            Self::Rsd => "RSD",
            Self::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown currency '{0}' (expected one of USD, EUR, BAM, RSD, GBP)")]
pub struct ParseCurrencyError(pub String);

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseCurrencyError(trimmed.to_string()))
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessType {
    Service,
    Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "One-time")]
    OneTime,
    Monthly,
    Yearly,
}

// =============================================================================
// INPUT
// =============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("business description is required")]
    MissingDescription,
    #[error("location is required")]
    MissingLocation,
    #[error("budget must be a positive number")]
    InvalidBudget,
    #[error("location '{0}' is not a recognized place")]
    LocationInvalid(String),
}

impl ErrorCode for FormError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDescription => "E_MISSING_DESCRIPTION",
            Self::MissingLocation => "E_MISSING_LOCATION",
            Self::InvalidBudget => "E_INVALID_BUDGET",
            Self::LocationInvalid(_) => "E_LOCATION_INVALID",
        }
    }
}

/// Editable form state. Optional overrides are blank when unused.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessForm {
    pub description: String,
    pub location: String,
    pub budget: f64,
    pub currency: Currency,
    pub existing_name: String,
    pub existing_slogan: String,
    /// Comma separated color preferences.
    pub existing_colors: String,
}

impl Default for BusinessForm {
    fn default() -> Self {
        Self {
            description: String::new(),
            location: String::new(),
            budget: DEFAULT_BUDGET,
            currency: Currency::default(),
            existing_name: String::new(),
            existing_slogan: String::new(),
            existing_colors: String::new(),
        }
    }
}

impl BusinessForm {
    /// Validate required fields and freeze the form into a request.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] naming the first missing or invalid field.
    pub fn to_request(&self) -> Result<BusinessRequest, FormError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(FormError::MissingDescription);
        }
        let location = self.location.trim();
        if location.is_empty() {
            return Err(FormError::MissingLocation);
        }
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(FormError::InvalidBudget);
        }

        let colors: Vec<String> = self
            .existing_colors
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();

        Ok(BusinessRequest {
            description: description.to_string(),
            location: location.to_string(),
            budget: self.budget,
            currency: self.currency,
            existing_name: non_blank(&self.existing_name),
            existing_slogan: non_blank(&self.existing_slogan),
            color_preferences: colors,
        })
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

/// Validated input for one generation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessRequest {
    pub description: String,
    pub location: String,
    pub budget: f64,
    pub currency: Currency,
    pub existing_name: Option<String>,
    pub existing_slogan: Option<String>,
    pub color_preferences: Vec<String>,
}

// =============================================================================
// REMOTE PAYLOADS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationValidation {
    pub is_valid: bool,
    pub normalized_name: String,
}

impl LocationValidation {
    /// Negative verdict that keeps the caller's input.
    #[must_use]
    pub fn rejected(input: &str) -> Self {
        Self { is_valid: false, normalized_name: input.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIdea {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub visual_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub category: String,
    pub item: String,
    pub cost: f64,
    pub frequency: Frequency,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPlan {
    pub items: Vec<BudgetItem>,
    pub total_estimated_monthly: f64,
    pub total_one_time_startup: f64,
    pub estimated_monthly_revenue: f64,
    pub break_even_months: f64,
    pub currency: Currency,
    pub advice: String,
    pub is_feasible: bool,
    pub suggested_minimum_budget: f64,
    pub missing_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandIdentity {
    pub company_name: String,
    pub slogan: String,
    pub description: String,
    pub color_palette: Vec<String>,
    pub logo_style: String,
    pub business_type: BusinessType,
    pub normalized_location: String,
    pub location_valid: bool,
    pub products: Vec<ProductIdea>,
    pub budget_plan: BudgetPlan,
}

impl BrandIdentity {
    /// Range checks serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        let plan = &self.budget_plan;
        for (name, value) in [
            ("totalEstimatedMonthly", plan.total_estimated_monthly),
            ("totalOneTimeStartup", plan.total_one_time_startup),
            ("estimatedMonthlyRevenue", plan.estimated_monthly_revenue),
            ("breakEvenMonths", plan.break_even_months),
            ("suggestedMinimumBudget", plan.suggested_minimum_budget),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("budgetPlan.{name} must be a non-negative number, got {value}"));
            }
        }
        for (idx, item) in plan.items.iter().enumerate() {
            if !item.cost.is_finite() || item.cost < 0.0 {
                return Err(format!("budgetPlan.items[{idx}].cost must be a non-negative number, got {}", item.cost));
            }
        }
        for (idx, product) in self.products.iter().enumerate() {
            if !product.price.is_finite() || product.price < 0.0 {
                return Err(format!("products[{idx}].price must be a non-negative number, got {}", product.price));
            }
        }
        Ok(())
    }
}

/// Image bytes as returned by the image model.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "brand_test.rs"]
mod tests;
