//! Social Security Benefits Worksheet (Form 1040 lines 6a/6b).

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::FilingStatusCode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialSecurityWorksheet {
    /// Line 1
    pub benefits: Money,
    /// Line 2
    pub half_benefits: Money,
    /// Line 8: provisional income
    pub provisional_income: Money,
    /// Line 9
    pub base_amount: Money,
    /// Line 18
    pub taxable_benefits: Money,
}

fn base_amounts(status: FilingStatusCode) -> (Money, Money) {
    match status {
        FilingStatusCode::MarriedFilingJointly => (Money::dollars(32_000), Money::dollars(12_000)),
        // Married filing separately and living with the spouse at any time.
        FilingStatusCode::MarriedFilingSeparately => (Money::ZERO, Money::ZERO),
        _ => (Money::dollars(25_000), Money::dollars(9_000)),
    }
}

/// Taxable portion of `benefits`.
///
/// `other_income` is total income excluding benefits, `tax_exempt_interest`
/// is Form 1040 line 2a and `adjustments` the Schedule 1 adjustments the
/// worksheet subtracts on line 6.
pub fn taxable_social_security(
    status: FilingStatusCode,
    benefits: Money,
    other_income: Money,
    tax_exempt_interest: Money,
    adjustments: Money,
) -> SocialSecurityWorksheet {
    let benefits = benefits.max_zero();
    let half_benefits = benefits.mul_rate(dec!(0.5));
    let provisional_income =
        (half_benefits + other_income + tax_exempt_interest - adjustments).max_zero();
    let (base_amount, tier_width) = base_amounts(status);

    let taxable_benefits = if benefits.is_zero() || provisional_income <= base_amount {
        Money::ZERO
    } else {
        let line10 = provisional_income - base_amount;
        let line12 = (line10 - tier_width).max_zero();
        let line13 = line10.min(tier_width);
        let line15 = line13.mul_rate(dec!(0.5)).min(half_benefits);
        let line17 = line15 + line12.mul_rate(dec!(0.85));
        line17.min(benefits.mul_rate(dec!(0.85)))
    };

    SocialSecurityWorksheet {
        benefits,
        half_benefits,
        provisional_income,
        base_amount,
        taxable_benefits,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn under_base_amount_is_untaxed() {
        let result = taxable_social_security(
            FilingStatusCode::Single,
            Money::dollars(20_000),
            Money::dollars(10_000),
            Money::ZERO,
            Money::ZERO,
        );

        assert_eq!(result.provisional_income, Money::dollars(20_000));
        assert_eq!(result.taxable_benefits, Money::ZERO);
    }

    #[test]
    fn first_tier_taxes_half_the_excess() {
        let result = taxable_social_security(
            FilingStatusCode::Single,
            Money::dollars(20_000),
            Money::dollars(20_000),
            Money::ZERO,
            Money::ZERO,
        );

        // Provisional 30,000; 5,000 over the base, all in the first tier.
        assert_eq!(result.taxable_benefits, Money::dollars(2_500));
    }

    #[test]
    fn second_tier_adds_85_percent() {
        let result = taxable_social_security(
            FilingStatusCode::MarriedFilingJointly,
            Money::dollars(30_000),
            Money::dollars(40_000),
            Money::dollars(2_000),
            Money::ZERO,
        );

        // Provisional 57,000: 25,000 over the base, 13,000 over the first tier.
        // min(6,000, 15,000) + 85% × 13,000 = 17,050, capped at 85% × 30,000.
        assert_eq!(result.taxable_benefits, Money::dollars(17_050));
    }

    #[test]
    fn capped_at_85_percent_of_benefits() {
        let result = taxable_social_security(
            FilingStatusCode::Single,
            Money::dollars(24_000),
            Money::dollars(200_000),
            Money::ZERO,
            Money::ZERO,
        );

        assert_eq!(result.taxable_benefits, Money::dollars(20_400));
    }

    #[test]
    fn separate_filers_have_no_base_amount() {
        let result = taxable_social_security(
            FilingStatusCode::MarriedFilingSeparately,
            Money::dollars(10_000),
            Money::dollars(1_000),
            Money::ZERO,
            Money::ZERO,
        );

        assert_eq!(result.taxable_benefits, Money::dollars(5_100));
    }
}
