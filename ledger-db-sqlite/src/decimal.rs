//! Fixed-point decimal handling for TEXT-stored monetary columns.
//!
//! Money never passes through SQLite's REAL type: currency amounts are
//! stored as 2-decimal-place strings and slab rates as 4-decimal-place
//! strings, so values round-trip without binary floating-point drift.

use ledger_core::RepositoryError;
use rust_decimal::Decimal;

/// Parse a decimal from its stored TEXT representation.
pub fn parse_decimal(s: &str) -> Result<Decimal, RepositoryError> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Database(format!("invalid decimal '{}': {}", s, e)))
}

/// Parse an optional decimal column (NULL maps to `None`).
pub fn parse_optional_decimal(s: Option<&str>) -> Result<Option<Decimal>, RepositoryError> {
    s.map(parse_decimal).transpose()
}

/// Render a currency amount as a 2-decimal-place string for storage.
pub fn format_money(value: Decimal) -> String {
    let mut rounded =
        value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

/// Render a tax rate as a 4-decimal-place fraction string for storage.
pub fn format_rate(value: Decimal) -> String {
    let mut rounded =
        value.round_dp_with_strategy(4, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(4);
    rounded.to_string()
}
