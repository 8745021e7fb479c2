use anyhow::Result;

use foisync::api::Endpoint;
use foisync::config::Config;
use foisync::storage::{SqliteTableRepository, TableRepository};

pub fn status(config: Config) -> Result<()> {
    let path = &config.store.id;
    if !path.exists() {
        println!("Store not found: {}", path.display());
        println!("Run a fetch first to create it.");
        return Ok(());
    }

    let repo = SqliteTableRepository::new(path)?;

    println!("Store Status");
    println!("============");
    println!("Store: {}", config.store_display_name());
    println!();

    for endpoint in Endpoint::all() {
        match repo.summary(endpoint.table())? {
            Some(summary) => println!(
                "{:<18} {:>8} rows  latest {}",
                summary.table,
                summary.rows,
                summary.latest_date.as_deref().unwrap_or("-")
            ),
            None => println!("{:<18} {:>8}", endpoint.table(), "missing"),
        }
    }

    Ok(())
}
