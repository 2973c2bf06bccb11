//! Qualified business income deduction, simplified computation (Form 8995).
//!
//! Filers above the threshold need Form 8995-A, which is not computed; the
//! result then carries no deduction and is marked `above_threshold`.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::FilingStatusCode;

pub fn threshold(status: FilingStatusCode) -> Money {
    if status == FilingStatusCode::MarriedFilingJointly {
        Money::dollars(394_600)
    } else {
        Money::dollars(197_300)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QbiResult {
    /// Line 4: business profit less the deductible part of SE tax.
    pub qualified_business_income: Money,
    /// Line 5
    pub qbi_component: Money,
    /// Line 11
    pub taxable_income_before_qbi: Money,
    /// Line 14
    pub income_limitation: Money,
    /// Line 15: Form 1040 line 13.
    pub deduction: Money,
    pub above_threshold: bool,
}

/// Returns `None` when there is no qualified business income.
pub fn compute_qbi(
    status: FilingStatusCode,
    qualified_business_income: Money,
    taxable_income_before_qbi: Money,
    net_capital_gain: Money,
) -> Option<QbiResult> {
    if !qualified_business_income.is_positive() {
        return None;
    }

    let rate = dec!(0.20);
    let qbi_component = qualified_business_income.mul_rate(rate);
    let income_limitation = (taxable_income_before_qbi - net_capital_gain.max_zero())
        .max_zero()
        .mul_rate(rate);
    let above_threshold = taxable_income_before_qbi > threshold(status);
    let deduction = if above_threshold {
        Money::ZERO
    } else {
        qbi_component.min(income_limitation)
    };

    Some(QbiResult {
        qualified_business_income,
        qbi_component,
        taxable_income_before_qbi,
        income_limitation,
        deduction,
        above_threshold,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn twenty_percent_of_business_income() {
        let result = compute_qbi(
            FilingStatusCode::Single,
            Money::dollars(50_000),
            Money::dollars(80_000),
            Money::ZERO,
        )
        .unwrap();

        assert_eq!(result.deduction, Money::dollars(10_000));
    }

    #[test]
    fn limited_by_taxable_income_less_capital_gain() {
        let result = compute_qbi(
            FilingStatusCode::Single,
            Money::dollars(50_000),
            Money::dollars(40_000),
            Money::dollars(10_000),
        )
        .unwrap();

        assert_eq!(result.deduction, Money::dollars(6_000));
    }

    #[test]
    fn above_threshold_is_flagged_not_computed() {
        let result = compute_qbi(
            FilingStatusCode::Single,
            Money::dollars(150_000),
            Money::dollars(250_000),
            Money::ZERO,
        )
        .unwrap();

        assert!(result.above_threshold);
        assert_eq!(result.deduction, Money::ZERO);
    }

    #[test]
    fn loss_is_none() {
        assert_eq!(
            compute_qbi(
                FilingStatusCode::Single,
                Money::dollars(-1_000),
                Money::dollars(40_000),
                Money::ZERO
            ),
            None
        );
    }
}
