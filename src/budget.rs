//! Derived views over a budget plan: category totals, top cost drivers,
//! listing search links and a one-line funding verdict.

use std::collections::HashMap;

use crate::brand::BudgetPlan;

const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Total cost per category, largest first. Ties keep first-seen order.
#[must_use]
pub fn category_totals(plan: &BudgetPlan) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for item in &plan.items {
        let entry = totals.entry(item.category.as_str()).or_insert_with(|| {
            order.push(item.category.clone());
            0.0
        });
        *entry += item.cost;
    }

    let mut out: Vec<(String, f64)> = order
        .into_iter()
        .map(|cat| {
            let total = totals.get(cat.as_str()).copied().unwrap_or_default();
            (cat, total)
        })
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

/// The `n` most expensive categories.
#[must_use]
pub fn top_cost_drivers(plan: &BudgetPlan, n: usize) -> Vec<(String, f64)> {
    let mut totals = category_totals(plan);
    totals.truncate(n);
    totals
}

/// Web search URL for a budget item's listing query.
#[must_use]
pub fn search_url(query: &str) -> String {
    match reqwest::Url::parse_with_params(SEARCH_ENDPOINT, &[("q", query)]) {
        Ok(url) => url.to_string(),
        Err(_) => SEARCH_ENDPOINT.to_string(),
    }
}

/// One-line verdict, e.g. `Feasible: 6000 BAM covers the 5000 BAM minimum`.
#[must_use]
pub fn funding_summary(plan: &BudgetPlan, user_budget: f64) -> String {
    let currency = plan.currency;
    if plan.is_feasible {
        format!(
            "Feasible: {user_budget:.0} {currency} covers the {:.0} {currency} minimum",
            plan.suggested_minimum_budget
        )
    } else {
        format!(
            "Underfunded: {user_budget:.0} {currency} is {:.0} {currency} short of the {:.0} {currency} minimum",
            plan.missing_budget, plan.suggested_minimum_budget
        )
    }
}

#[cfg(test)]
#[path = "budget_test.rs"]
mod tests;
