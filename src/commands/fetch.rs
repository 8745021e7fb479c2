use anyhow::{Context, Result};
use std::sync::Arc;

use foisync::config::Config;
use foisync::orchestrator::{FetchOrchestrator, FetchPlan};
use foisync::storage::SqliteTableRepository;
use foisync::RunSummary;

pub async fn fetch(config: Result<Config>, days: &str, endpoint: Option<&str>) -> Result<()> {
    // Reject bad arguments before credentials or the network are involved
    let today = chrono::Local::now().date_naive();
    let plan = FetchPlan::from_args(days, endpoint, today)?;

    let config = config?;
    config.validate()?;

    println!("Starting FOIS Fetch");
    println!("===================");
    println!("Zone: {}", config.api.zone);
    println!("Store: {}", config.store_display_name());
    println!(
        "Endpoints: {}",
        plan.endpoints()
            .iter()
            .map(|e| e.path())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let (Some(first), Some(last)) = (plan.dates().first(), plan.dates().last()) {
        println!("Days: {} ({first} .. {last})", plan.dates().len());
    }

    let repo = Arc::new(
        SqliteTableRepository::new(&config.store.id)
            .with_context(|| format!("Failed to open store {}", config.store.id.display()))?,
    );

    let orchestrator = FetchOrchestrator::from_config(&config, repo)?;
    let summary = orchestrator.run(&plan).await?;

    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nFetch Summary");
    println!("=============");
    println!("Tasks: {}", summary.tasks);
    println!("API calls: {}", summary.api_calls);
    println!(
        "Written: {} ({} rows)",
        summary.written, summary.rows_written
    );
    println!("Succeeded: {}", summary.succeeded());
    println!("Skipped (already present): {}", summary.skipped);
    println!("Empty for zone: {}", summary.empty);
    println!("Fetch failures: {}", summary.fetch_failures);
    println!("Write failures: {}", summary.write_failures);

    if !summary.failures.is_empty() {
        println!("\nFailures");
        println!("--------");
        for failure in &summary.failures {
            println!("  {} {}: {}", failure.endpoint, failure.date, failure.error);
        }
    }
}
