use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Workflow state of a tax record.
///
/// `Submitted` and `Paid` exist in the taxonomy for the downstream filing
/// workflow; no engine operation ever sets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxRecordStatus {
    Draft,
    PreviewAdjusted,
    ManualOverride,
    Submitted,
    Paid,
}

impl TaxRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PreviewAdjusted => "Preview (Adjusted)",
            Self::ManualOverride => "Manual Override",
            Self::Submitted => "Submitted",
            Self::Paid => "Paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Draft" => Some(Self::Draft),
            "Preview (Adjusted)" => Some(Self::PreviewAdjusted),
            "Manual Override" => Some(Self::ManualOverride),
            "Submitted" => Some(Self::Submitted),
            "Paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// The computed tax position for one fiscal year.
///
/// At most one persisted record exists per year; recalculation replaces the
/// prior record wholesale rather than versioning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub id: i64,
    pub year: i32,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_depreciation: Decimal,
    /// Profit minus depreciation, floored at zero.
    pub taxable_income: Decimal,
    pub tax_amount: Decimal,
    pub status: TaxRecordStatus,
    pub calculated_at: DateTime<Utc>,
}

/// For persisting a freshly computed record (no id or timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxRecord {
    pub year: i32,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_depreciation: Decimal,
    pub taxable_income: Decimal,
    pub tax_amount: Decimal,
    pub status: TaxRecordStatus,
}
