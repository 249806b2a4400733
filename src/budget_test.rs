use super::*;
use crate::brand::test_helpers;
use crate::feasibility;

fn sample_plan() -> BudgetPlan {
    test_helpers::identity("Product", 5000.0).budget_plan
}

#[test]
fn category_totals_sum_and_sort_descending() {
    let totals = category_totals(&sample_plan());
    assert_eq!(totals, vec![
        ("Equipment".to_string(), 6000.0),
        ("Premises".to_string(), 1700.0),
        ("Marketing".to_string(), 300.0),
    ]);
}

#[test]
fn category_totals_ties_keep_first_seen_order() {
    let mut plan = sample_plan();
    for item in &mut plan.items {
        item.cost = 100.0;
    }
    plan.items.truncate(3);
    let names: Vec<String> = category_totals(&plan)
        .into_iter()
        .map(|(c, _)| c)
        .collect();
    assert_eq!(names, ["Premises", "Equipment", "Marketing"]);
}

#[test]
fn category_totals_empty_plan() {
    let mut plan = sample_plan();
    plan.items.clear();
    assert!(category_totals(&plan).is_empty());
}

#[test]
fn top_cost_drivers_truncates() {
    let top = top_cost_drivers(&sample_plan(), 2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].0, "Equipment");
    assert_eq!(top_cost_drivers(&sample_plan(), 10).len(), 3);
}

#[test]
fn search_url_encodes_query() {
    assert_eq!(
        search_url("commercial kitchen rent Sarajevo"),
        "https://www.google.com/search?q=commercial+kitchen+rent+Sarajevo"
    );
    assert_eq!(search_url("ovens & mixers"), "https://www.google.com/search?q=ovens+%26+mixers");
}

#[test]
fn funding_summary_feasible() {
    let plan = feasibility::correct(sample_plan(), 6000.0);
    assert_eq!(funding_summary(&plan, 6000.0), "Feasible: 6000 BAM covers the 5000 BAM minimum");
}

#[test]
fn funding_summary_underfunded() {
    let plan = feasibility::correct(sample_plan(), 1000.0);
    assert_eq!(funding_summary(&plan, 1000.0), "Underfunded: 1000 BAM is 4000 BAM short of the 5000 BAM minimum");
}
