//! Schedule D and Form 8949: netting of short- and long-term results.

use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::entities::rsu::AdjustedSale;
use crate::models::{BrokerageTransaction, HoldingTerm};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDResult {
    pub short_term_proceeds: Money,
    pub short_term_basis: Money,
    /// Line 7
    pub short_term_gain: Money,
    pub long_term_proceeds: Money,
    pub long_term_basis: Money,
    /// Line 13
    pub capital_gain_distributions: Money,
    /// Line 15
    pub long_term_gain: Money,
    /// Line 16
    pub net_gain: Money,
    /// Line 21 (or line 16 when it is a gain): Form 1040 line 7.
    pub allowed_gain_loss: Money,
    /// Loss beyond the annual limit, carried to next year.
    pub loss_carryover: Money,
    /// Smaller of lines 15 and 16, not below zero.
    pub net_capital_gain: Money,
}

/// `sales` and `adjusted` are parallel: `adjusted[i]` is `sales[i]` after
/// basis correction.
pub fn compute_schedule_d(
    sales: &[BrokerageTransaction],
    adjusted: &[AdjustedSale],
    capital_gain_distributions: Money,
    loss_limit: Money,
) -> ScheduleDResult {
    let mut result = ScheduleDResult {
        capital_gain_distributions,
        ..Default::default()
    };
    for (sale, adjusted) in sales.iter().zip(adjusted) {
        match sale.term() {
            HoldingTerm::Short => {
                result.short_term_proceeds += adjusted.proceeds;
                result.short_term_basis += adjusted.basis;
                result.short_term_gain += adjusted.gain_loss;
            }
            HoldingTerm::Long => {
                result.long_term_proceeds += adjusted.proceeds;
                result.long_term_basis += adjusted.basis;
                result.long_term_gain += adjusted.gain_loss;
            }
        }
    }
    result.long_term_gain += capital_gain_distributions;
    result.net_gain = result.short_term_gain + result.long_term_gain;

    if result.net_gain.is_negative() {
        result.allowed_gain_loss = result.net_gain.max(-loss_limit);
        result.loss_carryover = result.allowed_gain_loss - result.net_gain;
    } else {
        result.allowed_gain_loss = result.net_gain;
    }
    result.net_capital_gain = result.long_term_gain.min(result.net_gain).max_zero();
    result
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn sale(
        term: HoldingTerm,
        gain: i64,
    ) -> (BrokerageTransaction, AdjustedSale) {
        let sale = BrokerageTransaction {
            date_sold: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            reported_term: Some(term),
            proceeds: Money::dollars(10_000),
            cost_basis: Money::dollars(10_000 - gain),
            ..Default::default()
        };
        let adjusted = AdjustedSale {
            sale_id: String::new(),
            proceeds: sale.proceeds,
            reported_basis: sale.cost_basis,
            basis: sale.cost_basis,
            gain_loss: Money::dollars(gain),
            matched_vest: None,
        };
        (sale, adjusted)
    }

    fn run(
        rows: &[(BrokerageTransaction, AdjustedSale)],
        distributions: i64,
    ) -> ScheduleDResult {
        let (sales, adjusted): (Vec<_>, Vec<_>) = rows.iter().cloned().unzip();
        compute_schedule_d(&sales, &adjusted, Money::dollars(distributions), Money::dollars(3_000))
    }

    #[test]
    fn nets_terms_and_distributions() {
        let result = run(
            &[sale(HoldingTerm::Short, -2_000), sale(HoldingTerm::Long, 5_000)],
            500,
        );

        assert_eq!(result.short_term_gain, Money::dollars(-2_000));
        assert_eq!(result.long_term_gain, Money::dollars(5_500));
        assert_eq!(result.allowed_gain_loss, Money::dollars(3_500));
        assert_eq!(result.net_capital_gain, Money::dollars(3_500));
    }

    #[test]
    fn loss_limited_with_carryover() {
        let result = run(&[sale(HoldingTerm::Short, -7_000)], 0);

        assert_eq!(result.allowed_gain_loss, Money::dollars(-3_000));
        assert_eq!(result.loss_carryover, Money::dollars(4_000));
        assert_eq!(result.net_capital_gain, Money::ZERO);
    }

    #[test]
    fn short_term_gain_is_not_preferential() {
        let result = run(&[sale(HoldingTerm::Short, 4_000)], 0);

        assert_eq!(result.allowed_gain_loss, Money::dollars(4_000));
        assert_eq!(result.net_capital_gain, Money::ZERO);
    }
}
