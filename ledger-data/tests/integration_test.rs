//! Integration tests for slab schedule loading using the SQLite backend.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

use ledger_core::db::{DbConfig, RepositoryRegistry};
use ledger_core::{
    ApprovalStatus, LedgerRepository, NewIncome, NullSink, TaxEngine, TaxRecordStatus,
};
use ledger_data::{SlabLoaderError, SlabScheduleLoader};
use ledger_db_sqlite::{SqliteRepository, SqliteRepositoryFactory};

const TEST_CSV: &str = include_str!("../test-data/default_slabs.csv");

async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool);
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");
    repo
}

#[tokio::test]
async fn load_inserts_the_whole_schedule() {
    let repo = setup_test_db().await;

    let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    let inserted = SlabScheduleLoader::load(&repo, &records)
        .await
        .expect("Failed to load schedule");

    assert_eq!(inserted, 3);

    let slabs = repo.list_tax_slabs().await.expect("Failed to list slabs");
    assert_eq!(slabs.len(), 3);
    assert_eq!(slabs[0].min_amount, dec!(0.00));
    assert_eq!(slabs[0].tax_rate, dec!(0.0500));
    assert_eq!(slabs[1].min_amount, dec!(100000.00));
    assert_eq!(slabs[2].max_amount, None);
    assert_eq!(slabs[2].tax_rate, dec!(0.1500));
}

// The CLI opens its repository through the backend registry; this covers
// that wiring end to end.
#[tokio::test]
async fn registry_opened_repository_accepts_a_schedule() {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));

    let repo = registry
        .create(&DbConfig::default())
        .await
        .expect("Failed to open in-memory repository");

    let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    let inserted = SlabScheduleLoader::load(repo.as_ref(), &records)
        .await
        .expect("Failed to load schedule");

    assert_eq!(inserted, 3);
    assert_eq!(repo.list_tax_slabs().await.unwrap().len(), 3);
}

#[tokio::test]
async fn load_is_idempotent() {
    let repo = setup_test_db().await;

    let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

    SlabScheduleLoader::load(&repo, &records)
        .await
        .expect("First load failed");
    SlabScheduleLoader::load(&repo, &records)
        .await
        .expect("Second load failed");

    let slabs = repo.list_tax_slabs().await.expect("Failed to list slabs");
    assert_eq!(slabs.len(), 3);
}

#[tokio::test]
async fn load_replaces_an_existing_schedule() {
    let repo = setup_test_db().await;

    // A stale single-slab schedule from a previous configuration.
    sqlx::query(
        "INSERT INTO tax_slabs (min_amount, max_amount, tax_rate, description)
         VALUES ('0.00', '50000.00', '0.2000', 'old')",
    )
    .execute(repo.pool())
    .await
    .expect("Failed to insert initial slab");

    let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    SlabScheduleLoader::load(&repo, &records)
        .await
        .expect("Failed to load schedule");

    let slabs = repo.list_tax_slabs().await.expect("Failed to list slabs");
    assert_eq!(slabs.len(), 3);
    assert!(slabs.iter().all(|s| s.description.as_deref() != Some("old")));
}

#[tokio::test]
async fn invalid_schedule_leaves_the_database_untouched() {
    let repo = setup_test_db().await;

    let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    SlabScheduleLoader::load(&repo, &records)
        .await
        .expect("Failed to load schedule");

    // Starts at 50000, so validation must fail before any write happens.
    let bad_csv = "min_amount,max_amount,tax_rate,description\n50000,,0.10,broken";
    let bad_records = SlabScheduleLoader::parse(bad_csv.as_bytes()).expect("Failed to parse CSV");

    let result = SlabScheduleLoader::load(&repo, &bad_records).await;
    assert!(matches!(result, Err(SlabLoaderError::InvalidSchedule(_))));

    let slabs = repo.list_tax_slabs().await.expect("Failed to list slabs");
    assert_eq!(slabs.len(), 3, "previous schedule must survive");
}

#[tokio::test]
async fn loaded_schedule_drives_tax_calculation() {
    let repo = setup_test_db().await;

    let records = SlabScheduleLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    SlabScheduleLoader::load(&repo, &records)
        .await
        .expect("Failed to load schedule");

    let income = repo
        .insert_income(NewIncome {
            amount: dec!(600000.00),
            source: "Sales".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        })
        .await
        .expect("Failed to insert income");
    repo.set_income_status(income.id, ApprovalStatus::Approved)
        .await
        .expect("Failed to approve income");

    let sink = NullSink;
    let engine = TaxEngine::new(&repo, &sink);
    let record = engine
        .calculate_tax(2024, None)
        .await
        .expect("Failed to calculate tax");

    // 100000 * 5% + 400000 * 10% + 100000 * 15% = 60000
    assert_eq!(record.taxable_income, dec!(600000.00));
    assert_eq!(record.tax_amount, dec!(60000.00));
    assert_eq!(record.status, TaxRecordStatus::Draft);
}
