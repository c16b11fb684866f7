use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, sqlite::SqlitePool};
use tracing::debug;

use ledger_core::{
    ApprovalStatus, Asset, AssetStatus, DepreciationMethod, Expense, FinancialPeriod, Income,
    LedgerRepository, NewExpense, NewIncome, NewTaxRecord, NewTaxSlab, RepositoryError, TaxRecord,
    TaxRecordStatus, TaxSlab,
};

use crate::decimal::{format_money, format_rate, parse_decimal, parse_optional_decimal};

use async_trait::async_trait;

/// SQLite-backed [`LedgerRepository`].
///
/// Monetary columns are TEXT-stored fixed-point decimals (see
/// [`crate::decimal`]); yearly sums are folded in Rust over the fetched rows
/// rather than summed in SQL, which would coerce the text to REAL.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate), RepositoryError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| RepositoryError::Database(format!("invalid year {year}")))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| RepositoryError::Database(format!("invalid year {year}")))?;
    Ok((start, end))
}

fn parse_approval(s: &str) -> Result<ApprovalStatus, RepositoryError> {
    ApprovalStatus::parse(s)
        .ok_or_else(|| RepositoryError::Database(format!("invalid approval status: {s}")))
}

fn parse_asset_status(s: &str) -> Result<AssetStatus, RepositoryError> {
    AssetStatus::parse(s)
        .ok_or_else(|| RepositoryError::Database(format!("invalid asset status: {s}")))
}

fn parse_method(s: &str) -> Result<DepreciationMethod, RepositoryError> {
    DepreciationMethod::parse(s)
        .ok_or_else(|| RepositoryError::Database(format!("invalid depreciation method: {s}")))
}

fn parse_record_status(s: &str) -> Result<TaxRecordStatus, RepositoryError> {
    TaxRecordStatus::parse(s)
        .ok_or_else(|| RepositoryError::Database(format!("invalid tax record status: {s}")))
}

fn row_to_income(row: &sqlx::sqlite::SqliteRow) -> Result<Income, RepositoryError> {
    let amount: String = row.try_get("amount").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(Income {
        id: row.try_get("id").map_err(db_err)?,
        amount: parse_decimal(&amount)?,
        source: row.try_get("source").map_err(db_err)?,
        date: row.try_get("date").map_err(db_err)?,
        status: parse_approval(&status)?,
    })
}

fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense, RepositoryError> {
    let amount: String = row.try_get("amount").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(Expense {
        id: row.try_get("id").map_err(db_err)?,
        amount: parse_decimal(&amount)?,
        category: row.try_get("category").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        date: row.try_get("date").map_err(db_err)?,
        status: parse_approval(&status)?,
    })
}

fn row_to_asset(row: &sqlx::sqlite::SqliteRow) -> Result<Asset, RepositoryError> {
    let purchase_price: String = row.try_get("purchase_price").map_err(db_err)?;
    let salvage_value: String = row.try_get("salvage_value").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    let method: String = row.try_get("method").map_err(db_err)?;
    Ok(Asset {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        purchase_price: parse_decimal(&purchase_price)?,
        salvage_value: parse_decimal(&salvage_value)?,
        useful_life_years: row.try_get("useful_life_years").map_err(db_err)?,
        purchase_date: row.try_get("purchase_date").map_err(db_err)?,
        status: parse_asset_status(&status)?,
        method: parse_method(&method)?,
    })
}

fn row_to_slab(row: &sqlx::sqlite::SqliteRow) -> Result<TaxSlab, RepositoryError> {
    let min_amount: String = row.try_get("min_amount").map_err(db_err)?;
    let max_amount: Option<String> = row.try_get("max_amount").map_err(db_err)?;
    let tax_rate: String = row.try_get("tax_rate").map_err(db_err)?;
    Ok(TaxSlab {
        id: row.try_get("id").map_err(db_err)?,
        min_amount: parse_decimal(&min_amount)?,
        max_amount: parse_optional_decimal(max_amount.as_deref())?,
        tax_rate: parse_decimal(&tax_rate)?,
        description: row.try_get("description").map_err(db_err)?,
    })
}

fn row_to_tax_record(row: &sqlx::sqlite::SqliteRow) -> Result<TaxRecord, RepositoryError> {
    let total_income: String = row.try_get("total_income").map_err(db_err)?;
    let total_expenses: String = row.try_get("total_expenses").map_err(db_err)?;
    let total_depreciation: String = row.try_get("total_depreciation").map_err(db_err)?;
    let taxable_income: String = row.try_get("taxable_income").map_err(db_err)?;
    let tax_amount: String = row.try_get("tax_amount").map_err(db_err)?;
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(TaxRecord {
        id: row.try_get("id").map_err(db_err)?,
        year: row.try_get("year").map_err(db_err)?,
        total_income: parse_decimal(&total_income)?,
        total_expenses: parse_decimal(&total_expenses)?,
        total_depreciation: parse_decimal(&total_depreciation)?,
        taxable_income: parse_decimal(&taxable_income)?,
        tax_amount: parse_decimal(&tax_amount)?,
        status: parse_record_status(&status)?,
        calculated_at: row
            .try_get::<DateTime<Utc>, _>("calculated_at")
            .map_err(db_err)?,
    })
}

fn row_to_period(row: &sqlx::sqlite::SqliteRow) -> Result<FinancialPeriod, RepositoryError> {
    Ok(FinancialPeriod {
        id: row.try_get("id").map_err(db_err)?,
        year: row.try_get("year").map_err(db_err)?,
        month: row.try_get("month").map_err(db_err)?,
        is_closed: row.try_get("is_closed").map_err(db_err)?,
        closed_at: row
            .try_get::<Option<DateTime<Utc>>, _>("closed_at")
            .map_err(db_err)?,
        closed_by: row.try_get("closed_by").map_err(db_err)?,
    })
}

#[async_trait]
impl LedgerRepository for SqliteRepository {
    async fn insert_income(
        &self,
        income: NewIncome,
    ) -> Result<Income, RepositoryError> {
        let amount = format_money(income.amount);
        let result = sqlx::query(
            "INSERT INTO incomes (amount, source, date, status) VALUES (?, ?, ?, ?)",
        )
        .bind(&amount)
        .bind(&income.source)
        .bind(income.date)
        .bind(ApprovalStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Income {
            id: result.last_insert_rowid(),
            amount: parse_decimal(&amount)?,
            source: income.source,
            date: income.date,
            status: ApprovalStatus::Pending,
        })
    }

    async fn insert_expense(
        &self,
        expense: NewExpense,
    ) -> Result<Expense, RepositoryError> {
        let amount = format_money(expense.amount);
        let result = sqlx::query(
            "INSERT INTO expenses (amount, category, description, date, status)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&amount)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.date)
        .bind(ApprovalStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Expense {
            id: result.last_insert_rowid(),
            amount: parse_decimal(&amount)?,
            category: expense.category,
            description: expense.description,
            date: expense.date,
            status: ApprovalStatus::Pending,
        })
    }

    async fn set_income_status(
        &self,
        id: i64,
        status: ApprovalStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE incomes SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_expense_status(
        &self,
        id: i64,
        status: ApprovalStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE expenses SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn approved_income_total(
        &self,
        year: i32,
    ) -> Result<Decimal, RepositoryError> {
        let (start, end) = year_bounds(year)?;
        let rows =
            sqlx::query("SELECT amount FROM incomes WHERE status = ? AND date BETWEEN ? AND ?")
                .bind(ApprovalStatus::Approved.as_str())
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        let mut total = Decimal::ZERO;
        for row in &rows {
            let amount: String = row.try_get("amount").map_err(db_err)?;
            total += parse_decimal(&amount)?;
        }
        Ok(total)
    }

    async fn approved_expense_total(
        &self,
        year: i32,
    ) -> Result<Decimal, RepositoryError> {
        let (start, end) = year_bounds(year)?;
        let rows =
            sqlx::query("SELECT amount FROM expenses WHERE status = ? AND date BETWEEN ? AND ?")
                .bind(ApprovalStatus::Approved.as_str())
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        let mut total = Decimal::ZERO;
        for row in &rows {
            let amount: String = row.try_get("amount").map_err(db_err)?;
            total += parse_decimal(&amount)?;
        }
        Ok(total)
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, purchase_price, salvage_value, useful_life_years,
                    purchase_date, status, method
             FROM assets ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_asset).collect()
    }

    async fn list_tax_slabs(&self) -> Result<Vec<TaxSlab>, RepositoryError> {
        // min_amount is TEXT; cast so the ordering is numeric, not lexicographic.
        let rows = sqlx::query(
            "SELECT id, min_amount, max_amount, tax_rate, description
             FROM tax_slabs ORDER BY CAST(min_amount AS REAL)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_slab).collect()
    }

    async fn insert_tax_slab(
        &self,
        slab: NewTaxSlab,
    ) -> Result<TaxSlab, RepositoryError> {
        let min_amount = format_money(slab.min_amount);
        let max_amount = slab.max_amount.map(format_money);
        let tax_rate = format_rate(slab.tax_rate);

        let result = sqlx::query(
            "INSERT INTO tax_slabs (min_amount, max_amount, tax_rate, description)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&min_amount)
        .bind(&max_amount)
        .bind(&tax_rate)
        .bind(&slab.description)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(TaxSlab {
            id: result.last_insert_rowid(),
            min_amount: parse_decimal(&min_amount)?,
            max_amount: parse_optional_decimal(max_amount.as_deref())?,
            tax_rate: parse_decimal(&tax_rate)?,
            description: slab.description,
        })
    }

    async fn delete_tax_slab(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_slabs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_tax_slabs(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM tax_slabs")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_tax_record(
        &self,
        year: i32,
    ) -> Result<TaxRecord, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, year, total_income, total_expenses, total_depreciation,
                    taxable_income, tax_amount, status, calculated_at
             FROM tax_records WHERE year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_tax_record(&row)
    }

    async fn list_tax_records(&self) -> Result<Vec<TaxRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, year, total_income, total_expenses, total_depreciation,
                    taxable_income, tax_amount, status, calculated_at
             FROM tax_records ORDER BY year DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_tax_record).collect()
    }

    async fn replace_tax_record(
        &self,
        record: NewTaxRecord,
    ) -> Result<TaxRecord, RepositoryError> {
        let now = Utc::now();
        let total_income = format_money(record.total_income);
        let total_expenses = format_money(record.total_expenses);
        let total_depreciation = format_money(record.total_depreciation);
        let taxable_income = format_money(record.taxable_income);
        let tax_amount = format_money(record.tax_amount);

        // Delete + insert must be one transaction: two concurrent
        // recalculations of the same year otherwise race into a state with
        // zero or two records.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM tax_records WHERE year = ?")
            .bind(record.year)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let result = sqlx::query(
            "INSERT INTO tax_records (
                year, total_income, total_expenses, total_depreciation,
                taxable_income, tax_amount, status, calculated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.year)
        .bind(&total_income)
        .bind(&total_expenses)
        .bind(&total_depreciation)
        .bind(&taxable_income)
        .bind(&tax_amount)
        .bind(record.status.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        debug!(year = record.year, "replaced tax record");

        Ok(TaxRecord {
            id: result.last_insert_rowid(),
            year: record.year,
            total_income: parse_decimal(&total_income)?,
            total_expenses: parse_decimal(&total_expenses)?,
            total_depreciation: parse_decimal(&total_depreciation)?,
            taxable_income: parse_decimal(&taxable_income)?,
            tax_amount: parse_decimal(&tax_amount)?,
            status: record.status,
            calculated_at: now,
        })
    }

    async fn update_tax_record(
        &self,
        record: &TaxRecord,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tax_records SET
                year = ?, total_income = ?, total_expenses = ?,
                total_depreciation = ?, taxable_income = ?, tax_amount = ?,
                status = ?
             WHERE id = ?",
        )
        .bind(record.year)
        .bind(format_money(record.total_income))
        .bind(format_money(record.total_expenses))
        .bind(format_money(record.total_depreciation))
        .bind(format_money(record.taxable_income))
        .bind(format_money(record.tax_amount))
        .bind(record.status.as_str())
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_financial_period(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Option<FinancialPeriod>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, year, month, is_closed, closed_at, closed_by
             FROM financial_periods WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(row_to_period).transpose()
    }

    async fn close_period(
        &self,
        year: i32,
        month: u32,
        closed_by: &str,
    ) -> Result<FinancialPeriod, RepositoryError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO financial_periods (year, month, is_closed, closed_at, closed_by)
             VALUES (?, ?, 1, ?, ?)
             ON CONFLICT (year, month) DO UPDATE SET
                is_closed = 1,
                closed_at = excluded.closed_at,
                closed_by = excluded.closed_by",
        )
        .bind(year)
        .bind(month)
        .bind(now)
        .bind(closed_by)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.get_financial_period(year, month)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn open_period(
        &self,
        year: i32,
        month: u32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE financial_periods
             SET is_closed = 0, closed_at = NULL, closed_by = NULL
             WHERE year = ? AND month = ?",
        )
        .bind(year)
        .bind(month)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}
