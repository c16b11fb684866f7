use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ledger_core::db::{DbConfig, RepositoryRegistry};
use ledger_data::SlabScheduleLoader;
use ledger_db_sqlite::SqliteRepositoryFactory;

/// Load a slab schedule from a CSV file into the ledger database.
///
/// The CSV file should have the following columns:
/// - min_amount: lower bound of the slab (inclusive)
/// - max_amount: upper bound (empty for unbounded; only the last slab may be)
/// - tax_rate: marginal rate as a decimal (e.g., 0.05)
/// - description: optional label
#[derive(Parser, Debug)]
#[command(name = "ledger-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing the slab schedule
    #[arg(short, long)]
    file: PathBuf,

    /// Database backend to open
    #[arg(short, long, default_value = "sqlite")]
    backend: String,

    /// Connection string (e.g., sqlite:ledger.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:ledger.db?mode=rwc")]
    database: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));

    // The factory connects and migrates in one step.
    let repo = registry
        .create(&DbConfig::new(&args.backend, &args.database))
        .await
        .with_context(|| {
            format!(
                "Failed to open '{}' database at: {}",
                args.backend, args.database
            )
        })?;

    println!("Loading slab schedule from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = SlabScheduleLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let inserted = SlabScheduleLoader::load(repo.as_ref(), &records)
        .await
        .context("Failed to load slab schedule into database")?;

    println!("Successfully loaded {} slabs into the database.", inserted);

    Ok(())
}
