//! Graduated bracket-tax evaluator.
//!
//! The tax is the sum over every filled bracket of
//! `rate × (min(income, max_income) − min_income)`, computed in exact
//! decimal arithmetic and rounded to the nearest cent once at the end.
//! Rounding per bracket would let cents drift across a seven-bracket
//! table; summing first keeps the result continuous at every boundary.

use rust_decimal::Decimal;

use crate::calculations::common::Money;
use crate::models::TaxBracket;

/// Exact (unrounded) tax in decimal dollars.
pub fn bracket_tax_exact(
    brackets: &[TaxBracket],
    income: Money,
) -> Decimal {
    if !income.is_positive() {
        return Decimal::ZERO;
    }

    brackets
        .iter()
        .filter(|bracket| income > bracket.min_income)
        .map(|bracket| {
            let top = bracket
                .max_income
                .map_or(income, |max_income| max_income.min(income));
            (top - bracket.min_income).to_decimal() * bracket.tax_rate
        })
        .sum()
}

/// Tax on `income`, rounded to the nearest cent.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_engine::calculations::bracket_tax;
/// use tax_engine::{Money, TaxBracket};
///
/// let brackets = [
///     TaxBracket::new(Money::ZERO, Some(Money::dollars(10_000)), dec!(0.10)),
///     TaxBracket::new(Money::dollars(10_000), None, dec!(0.20)),
/// ];
///
/// assert_eq!(bracket_tax(&brackets, Money::dollars(15_000)), Money::dollars(2_000));
/// ```
pub fn bracket_tax(
    brackets: &[TaxBracket],
    income: Money,
) -> Money {
    Money::from_decimal(bracket_tax_exact(brackets, income))
}

/// Rate of the bracket that the next dollar above `income` falls into.
pub fn marginal_rate(
    brackets: &[TaxBracket],
    income: Money,
) -> Decimal {
    brackets
        .iter()
        .rev()
        .find(|bracket| income >= bracket.min_income)
        .map_or(Decimal::ZERO, |bracket| bracket.tax_rate)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{FilingStatusCode, TaxYearConfig};

    fn single_brackets() -> &'static [TaxBracket] {
        TaxYearConfig::TY2025.brackets(FilingStatusCode::Single)
    }

    // =========================================================================
    // bracket_tax tests
    // =========================================================================

    #[test]
    fn bracket_tax_returns_zero_for_zero_income() {
        assert_eq!(bracket_tax(single_brackets(), Money::ZERO), Money::ZERO);
    }

    #[test]
    fn bracket_tax_returns_zero_for_negative_income() {
        assert_eq!(bracket_tax(single_brackets(), Money::dollars(-500)), Money::ZERO);
    }

    #[test]
    fn bracket_tax_first_bracket() {
        let result = bracket_tax(single_brackets(), Money::dollars(10_000));

        assert_eq!(result, Money::dollars(1_000));
    }

    #[test]
    fn bracket_tax_second_bracket() {
        let result = bracket_tax(single_brackets(), Money::dollars(30_000));

        // 1192.50 + (30000 - 11925) * 0.12 = 3361.50
        assert_eq!(result, Money::from_cents(336150));
    }

    #[test]
    fn bracket_tax_third_bracket() {
        let result = bracket_tax(single_brackets(), Money::dollars(85_000));

        // 5578.50 + (85000 - 48475) * 0.22 = 13614
        assert_eq!(result, Money::dollars(13_614));
    }

    #[test]
    fn bracket_tax_highest_bracket() {
        let result = bracket_tax(single_brackets(), Money::dollars(700_000));

        // 188769.75 + (700000 - 626350) * 0.37 = 216020.25
        assert_eq!(result, Money::from_cents(21602025));
    }

    #[test]
    fn bracket_tax_rounds_total_not_each_bracket() {
        // Three brackets each contribute a third of a cent.
        let brackets = [
            TaxBracket::new(Money::ZERO, Some(Money::from_cents(1)), dec!(0.333)),
            TaxBracket::new(Money::from_cents(1), Some(Money::from_cents(2)), dec!(0.333)),
            TaxBracket::new(Money::from_cents(2), None, dec!(0.334)),
        ];

        // Per-bracket rounding would give 0 + 0 + 0; exact sum is 0.01.
        assert_eq!(bracket_tax(&brackets, Money::from_cents(3)), Money::from_cents(1));
    }

    // =========================================================================
    // continuity
    // =========================================================================

    #[test]
    fn bracket_tax_is_continuous_at_every_boundary() {
        for status in [
            FilingStatusCode::Single,
            FilingStatusCode::MarriedFilingJointly,
            FilingStatusCode::MarriedFilingSeparately,
            FilingStatusCode::HeadOfHousehold,
        ] {
            let brackets = TaxYearConfig::TY2025.brackets(status);
            for window in brackets.windows(2) {
                let boundary = window[1].min_income;
                let below = bracket_tax_exact(brackets, boundary - Money::from_cents(1));
                let at = bracket_tax_exact(brackets, boundary);

                assert_eq!(
                    at - below,
                    window[0].tax_rate * dec!(0.01),
                    "discontinuity at {boundary} for {status:?}"
                );
            }
        }
    }

    // =========================================================================
    // marginal_rate tests
    // =========================================================================

    #[test]
    fn marginal_rate_finds_containing_bracket() {
        assert_eq!(marginal_rate(single_brackets(), Money::dollars(50_000)), dec!(0.22));
        assert_eq!(marginal_rate(single_brackets(), Money::ZERO), dec!(0.10));
        assert_eq!(marginal_rate(single_brackets(), Money::dollars(1_000_000)), dec!(0.37));
    }
}
