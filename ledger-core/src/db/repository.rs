use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    ApprovalStatus, Asset, Expense, FinancialPeriod, Income, NewExpense, NewIncome, NewTaxRecord,
    NewTaxSlab, TaxRecord, TaxSlab,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Persistence seam for the bookkeeping ledger.
///
/// The engine reads ledger facts and writes tax records exclusively through
/// this trait; it owns no storage of its own. Implementations must provide a
/// consistent snapshot across the reads of a single tax calculation, and
/// `replace_tax_record` must be atomic (one transaction, not a separate
/// delete followed by an insert).
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    // Income / expenses
    async fn insert_income(&self, income: NewIncome) -> Result<Income, RepositoryError>;
    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, RepositoryError>;
    async fn set_income_status(
        &self,
        id: i64,
        status: ApprovalStatus,
    ) -> Result<(), RepositoryError>;
    async fn set_expense_status(
        &self,
        id: i64,
        status: ApprovalStatus,
    ) -> Result<(), RepositoryError>;

    /// Sum of all `Approved` income amounts dated in `year`.
    async fn approved_income_total(&self, year: i32) -> Result<Decimal, RepositoryError>;

    /// Sum of all `Approved` expense amounts dated in `year`.
    async fn approved_expense_total(&self, year: i32) -> Result<Decimal, RepositoryError>;

    // Assets
    async fn list_assets(&self) -> Result<Vec<Asset>, RepositoryError>;

    // Tax slabs
    /// All configured slabs, ordered by ascending `min_amount`.
    async fn list_tax_slabs(&self) -> Result<Vec<TaxSlab>, RepositoryError>;
    async fn insert_tax_slab(&self, slab: NewTaxSlab) -> Result<TaxSlab, RepositoryError>;
    async fn delete_tax_slab(&self, id: i64) -> Result<(), RepositoryError>;
    async fn delete_tax_slabs(&self) -> Result<(), RepositoryError>;

    // Tax records
    async fn get_tax_record(&self, year: i32) -> Result<TaxRecord, RepositoryError>;

    /// All tax records, most recent year first.
    async fn list_tax_records(&self) -> Result<Vec<TaxRecord>, RepositoryError>;

    /// Replaces the record for `record.year` in a single transaction; any
    /// previous record for that year is gone afterwards.
    async fn replace_tax_record(&self, record: NewTaxRecord) -> Result<TaxRecord, RepositoryError>;

    async fn update_tax_record(&self, record: &TaxRecord) -> Result<(), RepositoryError>;

    // Financial periods
    async fn get_financial_period(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Option<FinancialPeriod>, RepositoryError>;

    /// Marks `(year, month)` closed, creating the marker lazily on first
    /// close and stamping the audit fields.
    async fn close_period(
        &self,
        year: i32,
        month: u32,
        closed_by: &str,
    ) -> Result<FinancialPeriod, RepositoryError>;

    /// Reopens `(year, month)` and clears its audit fields. Returns whether a
    /// marker existed; reopening a period that was never closed is a no-op.
    async fn open_period(&self, year: i32, month: u32) -> Result<bool, RepositoryError>;
}
