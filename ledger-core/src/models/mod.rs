mod asset;
mod financial_period;
mod tax_record;
mod tax_slab;
mod transaction;

pub use asset::{Asset, AssetStatus, DepreciationMethod};
pub use financial_period::FinancialPeriod;
pub use tax_record::{NewTaxRecord, TaxRecord, TaxRecordStatus};
pub use tax_slab::{NewTaxSlab, TaxSlab};
pub use transaction::{ApprovalStatus, Expense, Income, NewExpense, NewIncome};
