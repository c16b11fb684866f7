use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One progressive tax bracket.
///
/// `min_amount` is the inclusive lower bound; `max_amount` is the upper bound
/// (`None` means unbounded). `tax_rate` is a fraction with 4-decimal-place
/// fixed-point semantics (e.g. `0.0500` for 5%), applied to the portion of
/// income that falls inside the bracket.
///
/// Brackets compose progressively and are expected to be contiguous starting
/// at zero. The evaluator does not validate coverage — that is a caller
/// contract, enforced at the data-loading boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSlab {
    pub id: i64,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub tax_rate: Decimal,
    pub description: Option<String>,
}

/// For creating new slabs (no id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxSlab {
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    pub tax_rate: Decimal,
    pub description: Option<String>,
}
