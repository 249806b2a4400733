//! Local feasibility correction for budget plans.
//!
//! The model's own `isFeasible` flag is not trusted: it sometimes disagrees
//! with the numbers it produced. The verdict and funding gap are recomputed
//! from the user's budget and the suggested minimum.

use crate::brand::BudgetPlan;

/// Return `plan` with `is_feasible` and `missing_budget` recomputed.
#[must_use]
pub fn correct(mut plan: BudgetPlan, user_budget: f64) -> BudgetPlan {
    apply(&mut plan, user_budget);
    plan
}

/// In-place form of [`correct`].
pub fn apply(plan: &mut BudgetPlan, user_budget: f64) {
    let minimum = plan.suggested_minimum_budget;
    plan.is_feasible = user_budget >= minimum;
    plan.missing_budget = (minimum - user_budget).max(0.0);
}
