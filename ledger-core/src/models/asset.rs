use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a fixed asset.
///
/// Only `Approved` and `InUse` assets carry depreciation expense; everything
/// else depreciates to zero regardless of age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    Pending,
    Approved,
    Rejected,
    InUse,
    Disposed,
    Assigned,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::InUse => "In Use",
            Self::Disposed => "Disposed",
            Self::Assigned => "Assigned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Approved" => Some(Self::Approved),
            "Rejected" => Some(Self::Rejected),
            "In Use" => Some(Self::InUse),
            "Disposed" => Some(Self::Disposed),
            "Assigned" => Some(Self::Assigned),
            _ => None,
        }
    }

    /// Whether an asset in this state accrues depreciation expense.
    pub fn is_depreciable(&self) -> bool {
        matches!(self, Self::Approved | Self::InUse)
    }
}

/// Amortization method applied over an asset's useful life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepreciationMethod {
    StraightLine,
    ReducingBalance,
}

impl DepreciationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StraightLine => "StraightLine",
            Self::ReducingBalance => "ReducingBalance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "StraightLine" => Some(Self::StraightLine),
            "ReducingBalance" => Some(Self::ReducingBalance),
            _ => None,
        }
    }
}

/// A fixed asset as read from the ledger.
///
/// Monetary fields carry 2-decimal-place fixed-point semantics. The core
/// treats assets as immutable snapshots; it never mutates or persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub purchase_price: Decimal,
    pub salvage_value: Decimal,
    pub useful_life_years: i32,
    pub purchase_date: NaiveDate,
    pub status: AssetStatus,
    pub method: DepreciationMethod,
}

impl Asset {
    /// Calendar year the asset was purchased. Depreciation is computed at
    /// year granularity; the month and day of purchase are ignored.
    pub fn purchase_year(&self) -> i32 {
        self.purchase_date.year()
    }
}
