//! The tax calculation engine and the period-lock guard.
//!
//! [`TaxEngine`] orchestrates one fiscal year's tax computation: it pulls
//! ledger facts through a [`LedgerRepository`], folds depreciation over the
//! full asset set, derives taxable income, applies the slab schedule, and
//! either persists the result (normal run) or returns it transiently
//! (preview run). It also guards ledger mutations against closed financial
//! periods.
//!
//! The engine holds no state of its own; every operation works on the
//! snapshot the repository supplies and is safe to run from any thread. The
//! repository is expected to give a single `calculate_tax` call a consistent
//! view and to make the per-year record replacement atomic, which closes the
//! last-write-wins race between concurrent recalculations of the same year.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::common::max;
use crate::calculations::{
    DepreciationError, accumulated_depreciation, default_slab_schedule, tax_from_slabs,
};
use crate::db::repository::{LedgerRepository, RepositoryError};
use crate::models::{
    ApprovalStatus, Expense, FinancialPeriod, Income, NewExpense, NewIncome, NewTaxRecord,
    TaxRecord, TaxRecordStatus,
};

/// Errors surfaced by engine operations.
///
/// All of these are deterministic domain rejections, terminal for the
/// request; none warrant a retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A depreciable asset has parameters that make its depreciation
    /// undefined. The whole calculation fails rather than substituting zero.
    #[error("asset configuration: {0}")]
    Configuration(#[from] DepreciationError),

    /// A ledger mutation targeted a closed financial period.
    #[error("financial period {month}/{year} is closed")]
    PeriodClosed { year: i32, month: u32 },

    /// An operation required a tax record that has never been calculated.
    #[error("no tax record exists for year {0}")]
    RecordNotFound(i32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Domain events emitted by the engine for the hosting service to broadcast.
///
/// The engine only produces these; delivery (push channels, dashboards) is
/// the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxEvent {
    TaxCalculated { year: i32, amount: Decimal },
    TaxOverridden { year: i32, amount: Decimal },
    PeriodClosed { year: i32, month: u32 },
    PeriodOpened { year: i32, month: u32 },
}

/// Delivery seam for [`TaxEvent`]s.
///
/// Called synchronously after the corresponding state change has been
/// persisted. Implementations should be cheap; anything slow belongs on the
/// far side of a channel.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TaxEvent);
}

/// An [`EventSink`] that drops every event, for callers with no broadcast
/// layer (batch jobs, tests).
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: TaxEvent) {}
}

/// Orchestrates tax calculation and period-guarded ledger mutations over a
/// borrowed repository.
pub struct TaxEngine<'a> {
    repo: &'a dyn LedgerRepository,
    events: &'a dyn EventSink,
}

impl<'a> TaxEngine<'a> {
    pub fn new(
        repo: &'a dyn LedgerRepository,
        events: &'a dyn EventSink,
    ) -> Self {
        Self { repo, events }
    }

    /// Calculates the tax position for `year`.
    ///
    /// With `adjusted_depreciation` absent this is an authoritative run: the
    /// result replaces any existing record for the year (status `Draft`) and
    /// a [`TaxEvent::TaxCalculated`] is published. With it present this is a
    /// side-effect-free what-if query: the supplied value stands in for the
    /// asset fold, nothing is persisted, no event fires, and the returned
    /// record reads `Preview (Adjusted)`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] when any asset in the fold has
    /// degenerate parameters — the whole call fails, no partial commit.
    pub async fn calculate_tax(
        &self,
        year: i32,
        adjusted_depreciation: Option<Decimal>,
    ) -> Result<TaxRecord, EngineError> {
        let total_income = self.repo.approved_income_total(year).await?;
        let total_expenses = self.repo.approved_expense_total(year).await?;

        let total_depreciation = match adjusted_depreciation {
            Some(adjusted) => adjusted,
            None => self.total_depreciation(year).await?,
        };

        let profit = total_income - total_expenses;
        let taxable_income = max(profit - total_depreciation, Decimal::ZERO);

        let slabs = self.repo.list_tax_slabs().await?;
        let schedule = if slabs.is_empty() {
            warn!(year, "no tax slabs configured; using the default schedule");
            default_slab_schedule()
        } else {
            slabs
        };
        let tax_amount = tax_from_slabs(taxable_income, &schedule);

        debug!(
            year,
            %total_income,
            %total_expenses,
            %total_depreciation,
            %taxable_income,
            %tax_amount,
            "tax calculation complete"
        );

        if adjusted_depreciation.is_some() {
            return Ok(TaxRecord {
                id: 0,
                year,
                total_income,
                total_expenses,
                total_depreciation,
                taxable_income,
                tax_amount,
                status: TaxRecordStatus::PreviewAdjusted,
                calculated_at: Utc::now(),
            });
        }

        let record = self
            .repo
            .replace_tax_record(NewTaxRecord {
                year,
                total_income,
                total_expenses,
                total_depreciation,
                taxable_income,
                tax_amount,
                status: TaxRecordStatus::Draft,
            })
            .await?;

        self.events.publish(TaxEvent::TaxCalculated {
            year,
            amount: record.tax_amount,
        });

        Ok(record)
    }

    /// Stateless fold of accumulated depreciation over every asset in the
    /// ledger. Org-wide on purpose: tax does not filter by department or
    /// creator, and nothing is cached between calls.
    async fn total_depreciation(
        &self,
        year: i32,
    ) -> Result<Decimal, EngineError> {
        let assets = self.repo.list_assets().await?;

        let mut total = Decimal::ZERO;
        for asset in &assets {
            total += accumulated_depreciation(asset, year)?;
        }
        Ok(total)
    }

    /// Overwrites the tax amount of an already-calculated year.
    ///
    /// Only `tax_amount` and the status change; the computed totals stay as
    /// the last calculation left them. Publishes [`TaxEvent::TaxOverridden`].
    ///
    /// # Errors
    ///
    /// [`EngineError::RecordNotFound`] when the year has never been
    /// calculated — an override cannot create a record from nothing.
    pub async fn override_tax(
        &self,
        year: i32,
        amount: Decimal,
    ) -> Result<TaxRecord, EngineError> {
        let mut record = self.repo.get_tax_record(year).await.map_err(|e| match e {
            RepositoryError::NotFound => EngineError::RecordNotFound(year),
            other => EngineError::Repository(other),
        })?;

        record.tax_amount = amount;
        record.status = TaxRecordStatus::ManualOverride;
        self.repo.update_tax_record(&record).await?;

        self.events
            .publish(TaxEvent::TaxOverridden { year, amount });

        Ok(record)
    }

    /// Fetches the persisted record for `year`.
    ///
    /// # Errors
    ///
    /// [`EngineError::RecordNotFound`] when the year has never been
    /// calculated.
    pub async fn tax_report(
        &self,
        year: i32,
    ) -> Result<TaxRecord, EngineError> {
        self.repo.get_tax_record(year).await.map_err(|e| match e {
            RepositoryError::NotFound => EngineError::RecordNotFound(year),
            other => EngineError::Repository(other),
        })
    }

    /// Every persisted record, most recent year first.
    pub async fn tax_summary(&self) -> Result<Vec<TaxRecord>, EngineError> {
        Ok(self.repo.list_tax_records().await?)
    }

    /// Whether the financial period containing `date` is locked.
    ///
    /// A `(year, month)` with no marker is open by default.
    pub async fn is_period_closed(
        &self,
        date: NaiveDate,
    ) -> Result<bool, EngineError> {
        let period = self
            .repo
            .get_financial_period(date.year(), date.month())
            .await?;
        Ok(period.is_some_and(|p| p.is_closed))
    }

    /// Records new income, rejecting the mutation outright when its period is
    /// closed. The record starts `Pending`; it only counts toward taxable
    /// income once approved.
    pub async fn record_income(
        &self,
        income: NewIncome,
    ) -> Result<Income, EngineError> {
        self.ensure_period_open(income.date).await?;
        Ok(self.repo.insert_income(income).await?)
    }

    /// Records a new expense under the same period guard as income.
    pub async fn record_expense(
        &self,
        expense: NewExpense,
    ) -> Result<Expense, EngineError> {
        self.ensure_period_open(expense.date).await?;
        Ok(self.repo.insert_expense(expense).await?)
    }

    /// Moves an income record through the approval workflow.
    pub async fn review_income(
        &self,
        id: i64,
        status: ApprovalStatus,
    ) -> Result<(), EngineError> {
        Ok(self.repo.set_income_status(id, status).await?)
    }

    /// Moves an expense record through the approval workflow.
    pub async fn review_expense(
        &self,
        id: i64,
        status: ApprovalStatus,
    ) -> Result<(), EngineError> {
        Ok(self.repo.set_expense_status(id, status).await?)
    }

    /// Locks `(year, month)` against further ledger mutations, recording who
    /// closed it. Publishes [`TaxEvent::PeriodClosed`].
    pub async fn close_period(
        &self,
        year: i32,
        month: u32,
        closed_by: &str,
    ) -> Result<FinancialPeriod, EngineError> {
        let period = self.repo.close_period(year, month, closed_by).await?;
        self.events.publish(TaxEvent::PeriodClosed { year, month });
        Ok(period)
    }

    /// Administrative unlock. A no-op when the period was never closed;
    /// [`TaxEvent::PeriodOpened`] fires only when a marker actually existed.
    pub async fn open_period(
        &self,
        year: i32,
        month: u32,
    ) -> Result<(), EngineError> {
        let existed = self.repo.open_period(year, month).await?;
        if existed {
            self.events.publish(TaxEvent::PeriodOpened { year, month });
        }
        Ok(())
    }

    async fn ensure_period_open(
        &self,
        date: NaiveDate,
    ) -> Result<(), EngineError> {
        if self.is_period_closed(date).await? {
            return Err(EngineError::PeriodClosed {
                year: date.year(),
                month: date.month(),
            });
        }
        Ok(())
    }
}
