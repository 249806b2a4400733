use std::process::ExitCode;
use std::sync::Arc;

use brandforge::brand::{BrandIdentity, Currency, DEFAULT_BUDGET};
use brandforge::budget::{category_totals, funding_summary, search_url, top_cost_drivers};
use brandforge::error::ErrorCode;
use brandforge::llm::LlmClient;
use brandforge::llm::types::LlmError;
use brandforge::retry::RetryPolicy;
use brandforge::session::{LocationStatus, Session, SessionError, SessionState, Slot, SlotState};
use clap::Parser;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("LLM client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("{0}")]
    Session(#[from] SessionError),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Llm(e) => e.error_code(),
            Self::Session(e) => e.error_code(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "brandforge", about = "Generate a brand package and startup budget for a business idea")]
struct Cli {
    /// What the business does.
    #[arg(long, env = "BRAND_DESCRIPTION")]
    description: String,

    /// City, region or country to launch in.
    #[arg(long, env = "BRAND_LOCATION")]
    location: String,

    /// Available starting capital.
    #[arg(long, env = "BRAND_BUDGET", default_value_t = DEFAULT_BUDGET)]
    budget: f64,

    #[arg(long, env = "BRAND_CURRENCY", default_value = "USD")]
    currency: Currency,

    /// Keep this company name instead of generating one.
    #[arg(long)]
    name: Option<String>,

    /// Keep this slogan instead of generating one.
    #[arg(long)]
    slogan: Option<String>,

    /// Comma separated color preferences.
    #[arg(long)]
    colors: Option<String>,

    #[arg(long)]
    skip_location_check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error [{}]: {e}", e.code());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let llm = LlmClient::from_env()?;
    tracing::info!(text_model = llm.text_model(), image_model = llm.image_model(), "brandforge starting");
    let session = Session::new(Arc::new(llm), RetryPolicy::from_env());

    let skip_location_check = cli.skip_location_check;
    session
        .update_form(move |form| {
            form.description = cli.description;
            form.location = cli.location;
            form.budget = cli.budget;
            form.currency = cli.currency;
            form.existing_name = cli.name.unwrap_or_default();
            form.existing_slogan = cli.slogan.unwrap_or_default();
            form.existing_colors = cli.colors.unwrap_or_default();
        })
        .await;

    if !skip_location_check {
        match session.check_location().await {
            Ok(LocationStatus::Valid) => println!("Location: {}", session.form().await.location),
            Ok(LocationStatus::Invalid) => println!("Location not recognized: {}", session.form().await.location),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "location check unavailable; continuing"),
        }
    }

    session.submit().await?;
    session.images_settled().await;

    let state = session.snapshot().await;
    if let Some(identity) = &state.identity {
        print_identity(identity, &state);
        print_budget(identity, state.form.budget);
    }
    if session.quota_blocked() {
        println!("\nImage quota is exhausted for this API key; remaining images were skipped.");
    }
    Ok(())
}

fn slot_line(state: &SessionState, slot: Slot) -> String {
    match state.slots.get(&slot) {
        Some(SlotState::Ready(image)) => format!("{} ({} bytes)", image.mime_type, image.data.len()),
        Some(SlotState::Failed { message, .. }) => message.clone(),
        Some(SlotState::Pending) | None => "not generated".to_string(),
    }
}

fn print_identity(identity: &BrandIdentity, state: &SessionState) {
    println!("\n{}", identity.company_name);
    println!("\"{}\"", identity.slogan);
    println!("{}", identity.description);
    println!("\nType:     {:?}", identity.business_type);
    println!("Location: {}", identity.normalized_location);
    println!("Palette:  {}", identity.color_palette.join(", "));
    println!("Logo:     {}", slot_line(state, Slot::Logo));

    println!("\nOfferings");
    let currency = identity.budget_plan.currency;
    for (index, product) in identity.products.iter().enumerate() {
        println!("  {}. {} ({:.2} {currency})", index + 1, product.name, product.price);
        println!("     {}", product.description);
        println!("     image: {}", slot_line(state, Slot::Offering(index)));
    }
}

fn print_budget(identity: &BrandIdentity, user_budget: f64) {
    let plan = &identity.budget_plan;
    let currency = plan.currency;

    println!("\nBudget");
    for item in &plan.items {
        println!(
            "  [{}] {}: {:.0} {currency} ({:?})",
            item.category, item.item, item.cost, item.frequency
        );
        if let Some(query) = &item.search_query {
            println!("      {}", search_url(query));
        }
    }

    println!("\nBy category");
    for (category, total) in category_totals(plan) {
        println!("  {category}: {total:.0} {currency}");
    }
    let drivers: Vec<String> = top_cost_drivers(plan, 3)
        .into_iter()
        .map(|(category, _)| category)
        .collect();
    println!("Top cost drivers: {}", drivers.join(", "));

    println!("\nMonthly costs:    {:.0} {currency}", plan.total_estimated_monthly);
    println!("One-time startup: {:.0} {currency}", plan.total_one_time_startup);
    println!("Monthly revenue:  {:.0} {currency}", plan.estimated_monthly_revenue);
    println!("Break-even:       {:.1} months", plan.break_even_months);
    println!("\n{}", funding_summary(plan, user_budget));
    println!("{}", plan.advice);
}
