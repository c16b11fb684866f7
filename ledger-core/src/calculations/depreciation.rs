//! Accumulated depreciation for fixed assets.
//!
//! Two amortization methods are supported:
//!
//! - **Straight line** — equal annual expense of
//!   `(purchase_price - salvage_value) / useful_life_years`. The purchase
//!   year itself counts as one full year of depreciation; there is no
//!   monthly pro-rating.
//! - **Reducing balance** — a constant rate
//!   `r = 1 - (salvage / price)^(1 / life)` applied to a shrinking book
//!   value each year, starting from the purchase price.
//!
//! Under either method accumulated depreciation never exceeds the
//! depreciable base (`purchase_price - salvage_value`), and assets that are
//! not `Approved` or `In Use` carry no depreciation at all.
//!
//! All arithmetic is fixed-point [`Decimal`]. The one place floating point
//! is unavoidable is the reducing-balance rate derivation (a fractional
//! power); it is computed in `f64` and converted back to `Decimal` before
//! any compounding happens.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use ledger_core::calculations::accumulated_depreciation;
//! use ledger_core::{Asset, AssetStatus, DepreciationMethod};
//!
//! let asset = Asset {
//!     id: 1,
//!     name: "Delivery van".to_string(),
//!     purchase_price: dec!(10000.00),
//!     salvage_value: dec!(1000.00),
//!     useful_life_years: 5,
//!     purchase_date: NaiveDate::from_ymd_opt(2020, 3, 15).unwrap(),
//!     status: AssetStatus::Approved,
//!     method: DepreciationMethod::StraightLine,
//! };
//!
//! // One full year in the purchase year, three by 2022, clamped at the
//! // depreciable base from 2025 onward.
//! assert_eq!(accumulated_depreciation(&asset, 2020).unwrap(), dec!(1800.00));
//! assert_eq!(accumulated_depreciation(&asset, 2022).unwrap(), dec!(5400.00));
//! assert_eq!(accumulated_depreciation(&asset, 2025).unwrap(), dec!(9000.00));
//! ```

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::models::{Asset, DepreciationMethod};

/// Errors raised for assets whose parameters make depreciation undefined.
///
/// These are configuration problems, not transient faults: the orchestrator
/// surfaces them instead of silently substituting zero.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepreciationError {
    /// The asset's useful life is zero or negative.
    #[error("asset {0} has a useful life of zero years")]
    ZeroUsefulLife(i64),

    /// The asset's purchase price is zero or negative.
    #[error("asset {0} has a purchase price of zero")]
    ZeroPurchasePrice(i64),

    /// The reducing-balance rate could not be derived (non-finite result).
    #[error("could not derive a reducing-balance rate for asset {0}")]
    RateDerivation(i64),
}

/// Computes the accumulated depreciation of `asset` as of the end of
/// `as_of_year`.
///
/// Returns zero for years before the purchase year and for assets whose
/// status is not depreciable. Assets past the end of their useful life are
/// fully depreciated at `purchase_price - salvage_value`.
///
/// # Errors
///
/// Returns [`DepreciationError`] when a depreciable asset has a zero useful
/// life or purchase price, or when the reducing-balance rate cannot be
/// derived. The gates run first, so non-depreciable rows with junk
/// parameters do not fail a batch run.
pub fn accumulated_depreciation(
    asset: &Asset,
    as_of_year: i32,
) -> Result<Decimal, DepreciationError> {
    if as_of_year < asset.purchase_year() {
        return Ok(Decimal::ZERO);
    }
    if !asset.status.is_depreciable() {
        return Ok(Decimal::ZERO);
    }

    if asset.useful_life_years <= 0 {
        return Err(DepreciationError::ZeroUsefulLife(asset.id));
    }
    if asset.purchase_price <= Decimal::ZERO {
        return Err(DepreciationError::ZeroPurchasePrice(asset.id));
    }

    let depreciable_base = asset.purchase_price - asset.salvage_value;
    let years_elapsed = as_of_year - asset.purchase_year();

    if years_elapsed >= asset.useful_life_years {
        return Ok(round_half_up(depreciable_base));
    }

    let accumulated = match asset.method {
        DepreciationMethod::StraightLine => {
            let annual = depreciable_base / Decimal::from(asset.useful_life_years);
            annual * Decimal::from(years_elapsed + 1)
        }
        DepreciationMethod::ReducingBalance => {
            let rate = reducing_balance_rate(asset)?;
            let mut book_value = asset.purchase_price;
            let mut accumulated = Decimal::ZERO;

            // Iterated from year zero; a closed form rounds differently.
            for _ in 0..=years_elapsed {
                let yearly = book_value * rate;
                accumulated += yearly;
                book_value -= yearly;
            }

            accumulated.min(depreciable_base)
        }
    };

    Ok(round_half_up(accumulated))
}

/// Derives the constant reducing-balance rate
/// `1 - (salvage / price)^(1 / life)`.
///
/// The fractional power has no fixed-point equivalent, so this is computed in
/// double precision and converted back before any compounding.
fn reducing_balance_rate(asset: &Asset) -> Result<Decimal, DepreciationError> {
    let ratio = (asset.salvage_value / asset.purchase_price)
        .to_f64()
        .ok_or(DepreciationError::RateDerivation(asset.id))?;
    let rate = 1.0 - ratio.powf(1.0 / f64::from(asset.useful_life_years));

    if !rate.is_finite() {
        return Err(DepreciationError::RateDerivation(asset.id));
    }

    Decimal::try_from(rate).map_err(|_| DepreciationError::RateDerivation(asset.id))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::AssetStatus;

    fn asset(method: DepreciationMethod) -> Asset {
        Asset {
            id: 7,
            name: "Lathe".to_string(),
            purchase_price: dec!(10000.00),
            salvage_value: dec!(1000.00),
            useful_life_years: 5,
            purchase_date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            status: AssetStatus::Approved,
            method,
        }
    }

    #[test]
    fn zero_before_purchase_year() {
        let a = asset(DepreciationMethod::StraightLine);

        assert_eq!(accumulated_depreciation(&a, 2019).unwrap(), dec!(0));
    }

    #[test]
    fn zero_for_non_depreciable_statuses() {
        for status in [
            AssetStatus::Pending,
            AssetStatus::Rejected,
            AssetStatus::Disposed,
            AssetStatus::Assigned,
        ] {
            let mut a = asset(DepreciationMethod::StraightLine);
            a.status = status;

            assert_eq!(
                accumulated_depreciation(&a, 2023).unwrap(),
                dec!(0),
                "status {:?} must not depreciate",
                status
            );
        }
    }

    #[test]
    fn in_use_assets_depreciate() {
        let mut a = asset(DepreciationMethod::StraightLine);
        a.status = AssetStatus::InUse;

        assert_eq!(accumulated_depreciation(&a, 2020).unwrap(), dec!(1800.00));
    }

    #[test]
    fn straight_line_counts_purchase_year_as_full_year() {
        let a = asset(DepreciationMethod::StraightLine);

        assert_eq!(accumulated_depreciation(&a, 2020).unwrap(), dec!(1800.00));
    }

    #[test]
    fn straight_line_accumulates_per_year() {
        let a = asset(DepreciationMethod::StraightLine);

        assert_eq!(accumulated_depreciation(&a, 2022).unwrap(), dec!(5400.00));
    }

    #[test]
    fn straight_line_clamps_at_useful_life() {
        let a = asset(DepreciationMethod::StraightLine);

        assert_eq!(accumulated_depreciation(&a, 2025).unwrap(), dec!(9000.00));
        assert_eq!(accumulated_depreciation(&a, 2040).unwrap(), dec!(9000.00));
    }

    #[test]
    fn reducing_balance_first_year() {
        let a = asset(DepreciationMethod::ReducingBalance);

        // r = 1 - (0.1)^(1/5) ≈ 0.3690, so the first-year expense is close
        // to 3690.43 but never exact across float implementations.
        let first = accumulated_depreciation(&a, 2020).unwrap();
        assert!(
            first > dec!(3690) && first < dec!(3691),
            "first-year depreciation out of range: {first}"
        );
    }

    #[test]
    fn reducing_balance_never_exceeds_depreciable_base() {
        let a = asset(DepreciationMethod::ReducingBalance);

        for year in 2020..2035 {
            let accumulated = accumulated_depreciation(&a, year).unwrap();
            assert!(
                accumulated <= dec!(9000.00),
                "year {year}: {accumulated} exceeds the depreciable base"
            );
        }
    }

    #[test]
    fn reducing_balance_is_monotonic_in_year() {
        let a = asset(DepreciationMethod::ReducingBalance);

        let mut previous = Decimal::ZERO;
        for year in 2020..2030 {
            let accumulated = accumulated_depreciation(&a, year).unwrap();
            assert!(accumulated >= previous, "regressed at year {year}");
            previous = accumulated;
        }
    }

    #[test]
    fn reducing_balance_with_zero_salvage_depreciates_fully_in_year_one() {
        let mut a = asset(DepreciationMethod::ReducingBalance);
        a.salvage_value = dec!(0);

        // ratio 0 gives rate 1: the whole base in the first year.
        assert_eq!(accumulated_depreciation(&a, 2020).unwrap(), dec!(10000.00));
    }

    #[test]
    fn zero_useful_life_is_a_configuration_error() {
        let mut a = asset(DepreciationMethod::StraightLine);
        a.useful_life_years = 0;

        assert_eq!(
            accumulated_depreciation(&a, 2022),
            Err(DepreciationError::ZeroUsefulLife(7))
        );
    }

    #[test]
    fn zero_purchase_price_is_a_configuration_error() {
        let mut a = asset(DepreciationMethod::ReducingBalance);
        a.purchase_price = dec!(0);
        a.salvage_value = dec!(0);

        assert_eq!(
            accumulated_depreciation(&a, 2022),
            Err(DepreciationError::ZeroPurchasePrice(7))
        );
    }

    #[test]
    fn degenerate_parameters_are_ignored_on_non_depreciable_assets() {
        let mut a = asset(DepreciationMethod::StraightLine);
        a.useful_life_years = 0;
        a.status = AssetStatus::Rejected;

        assert_eq!(accumulated_depreciation(&a, 2022).unwrap(), dec!(0));
    }
}
