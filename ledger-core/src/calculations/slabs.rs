//! Progressive tax computation over configurable bracket slabs.
//!
//! Each [`TaxSlab`] taxes the portion of income that falls inside its range
//! at a flat rate; slabs compose progressively in ascending `min_amount`
//! order. An unbounded slab (`max_amount == None`) absorbs everything that
//! remains.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ledger_core::calculations::{default_slab_schedule, tax_from_slabs};
//!
//! // 5% on the first 100k, 10% on the next 400k, 15% above.
//! let schedule = default_slab_schedule();
//! assert_eq!(tax_from_slabs(dec!(600000), &schedule), dec!(60000.00));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::calculations::common::round_half_up;
use crate::models::TaxSlab;

/// Computes total tax on `taxable_income` under the given slab schedule.
///
/// `taxable_income >= 0` is a precondition; the orchestrator floors it
/// upstream. Slabs are re-sorted by `min_amount` defensively rather than
/// trusting callers to pass them ordered.
///
/// Income left over after every bracket is exhausted is not taxed: when all
/// slabs are bounded and their combined span is smaller than the income, the
/// excess escapes. A well-formed schedule ends in an unbounded slab.
pub fn tax_from_slabs(
    taxable_income: Decimal,
    slabs: &[TaxSlab],
) -> Decimal {
    let mut ordered: Vec<&TaxSlab> = slabs.iter().collect();
    ordered.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));

    let mut tax = Decimal::ZERO;
    let mut remaining = taxable_income;

    for slab in ordered {
        if remaining <= Decimal::ZERO {
            break;
        }

        let span = match slab.max_amount {
            Some(max_amount) => remaining.min(max_amount - slab.min_amount),
            None => remaining,
        };

        tax += span * slab.tax_rate;
        remaining -= span;
    }

    round_half_up(tax)
}

/// The built-in three-bracket demo schedule: 5% up to 100,000, 10% on the
/// next 400,000, and 15% above 500,000.
///
/// This is fallback policy for installations with no configured slabs, not
/// part of the evaluator itself; the engine injects it only when the
/// configured schedule is empty, so deployments can swap or disable it
/// without touching the algorithm.
pub fn default_slab_schedule() -> Vec<TaxSlab> {
    vec![
        TaxSlab {
            id: 0,
            min_amount: dec!(0),
            max_amount: Some(dec!(100000)),
            tax_rate: dec!(0.0500),
            description: Some("Default bracket: 5% up to 100,000".to_string()),
        },
        TaxSlab {
            id: 0,
            min_amount: dec!(100000),
            max_amount: Some(dec!(500000)),
            tax_rate: dec!(0.1000),
            description: Some("Default bracket: 10% to 500,000".to_string()),
        },
        TaxSlab {
            id: 0,
            min_amount: dec!(500000),
            max_amount: None,
            tax_rate: dec!(0.1500),
            description: Some("Default bracket: 15% above 500,000".to_string()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn slab(
        min: Decimal,
        max: Option<Decimal>,
        rate: Decimal,
    ) -> TaxSlab {
        TaxSlab {
            id: 0,
            min_amount: min,
            max_amount: max,
            tax_rate: rate,
            description: None,
        }
    }

    #[test]
    fn default_schedule_taxes_600k_at_60k() {
        // 100,000 x 5% + 400,000 x 10% + 100,000 x 15%
        let tax = tax_from_slabs(dec!(600000), &default_slab_schedule());

        assert_eq!(tax, dec!(60000.00));
    }

    #[test]
    fn default_schedule_taxes_income_inside_first_bracket() {
        let tax = tax_from_slabs(dec!(80000), &default_slab_schedule());

        assert_eq!(tax, dec!(4000.00));
    }

    #[test]
    fn custom_slabs_compose_progressively() {
        let slabs = vec![
            slab(dec!(0), Some(dec!(50000)), dec!(0.0200)),
            slab(dec!(50000), None, dec!(0.0800)),
        ];

        // 50,000 x 2% + 30,000 x 8%
        assert_eq!(tax_from_slabs(dec!(80000), &slabs), dec!(3400.00));
    }

    #[test]
    fn unsorted_slabs_are_reordered_before_walking() {
        let slabs = vec![
            slab(dec!(50000), None, dec!(0.0800)),
            slab(dec!(0), Some(dec!(50000)), dec!(0.0200)),
        ];

        assert_eq!(tax_from_slabs(dec!(80000), &slabs), dec!(3400.00));
    }

    #[test]
    fn zero_income_is_untaxed() {
        assert_eq!(
            tax_from_slabs(dec!(0), &default_slab_schedule()),
            dec!(0.00)
        );
    }

    #[test]
    fn empty_schedule_taxes_nothing() {
        assert_eq!(tax_from_slabs(dec!(250000), &[]), dec!(0.00));
    }

    #[test]
    fn stops_early_once_income_is_exhausted() {
        let slabs = vec![
            slab(dec!(0), Some(dec!(10000)), dec!(0.0100)),
            slab(dec!(10000), Some(dec!(20000)), dec!(0.5000)),
        ];

        // Only the first bracket is touched.
        assert_eq!(tax_from_slabs(dec!(10000), &slabs), dec!(100.00));
    }

    /// When every slab is bounded and income exceeds their combined span,
    /// the excess escapes taxation entirely. This test pins that contract
    /// so it cannot change unnoticed.
    #[test]
    fn income_beyond_all_bounded_slabs_escapes_untaxed() {
        let slabs = vec![
            slab(dec!(0), Some(dec!(100000)), dec!(0.0500)),
            slab(dec!(100000), Some(dec!(500000)), dec!(0.1000)),
        ];

        // 100,000 x 5% + 400,000 x 10%; the remaining 9,500,000 is untaxed.
        assert_eq!(tax_from_slabs(dec!(10000000), &slabs), dec!(45000.00));
    }

    #[test]
    fn fractional_rates_round_half_up_to_currency_precision() {
        let slabs = vec![slab(dec!(0), None, dec!(0.0333))];

        assert_eq!(tax_from_slabs(dec!(100.55), &slabs), dec!(3.35));
    }
}
