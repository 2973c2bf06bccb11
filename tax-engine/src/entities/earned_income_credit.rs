//! Earned income credit (Form 1040 line 27), computed from the credit
//! formula rather than the published EIC table.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::FilingStatusCode;

const INVESTMENT_INCOME_LIMIT: Money = Money::dollars(11_950);
const NO_CHILD_MIN_AGE: i32 = 25;
const NO_CHILD_MAX_AGE: i32 = 64;

struct EicParameters {
    phase_in_rate: Decimal,
    max_credit: Money,
    phase_out_start: Money,
    phase_out_start_joint: Money,
    phase_out_rate: Decimal,
}

/// Indexed by number of qualifying children, capped at three.
const PARAMETERS: [EicParameters; 4] = [
    EicParameters {
        phase_in_rate: dec!(0.0765),
        max_credit: Money::dollars(649),
        phase_out_start: Money::dollars(10_620),
        phase_out_start_joint: Money::dollars(17_730),
        phase_out_rate: dec!(0.0765),
    },
    EicParameters {
        phase_in_rate: dec!(0.34),
        max_credit: Money::dollars(4_328),
        phase_out_start: Money::dollars(23_350),
        phase_out_start_joint: Money::dollars(30_470),
        phase_out_rate: dec!(0.1598),
    },
    EicParameters {
        phase_in_rate: dec!(0.40),
        max_credit: Money::dollars(7_152),
        phase_out_start: Money::dollars(23_350),
        phase_out_start_joint: Money::dollars(30_470),
        phase_out_rate: dec!(0.2106),
    },
    EicParameters {
        phase_in_rate: dec!(0.45),
        max_credit: Money::dollars(8_046),
        phase_out_start: Money::dollars(23_350),
        phase_out_start_joint: Money::dollars(30_470),
        phase_out_rate: dec!(0.2106),
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnedIncomeCreditInput {
    pub filing_status: FilingStatusCode,
    pub qualifying_children: u32,
    pub earned_income: Money,
    pub agi: Money,
    pub investment_income: Money,
    /// Ages of the filers (one or two) at year end.
    pub filer_ages: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedIncomeCreditResult {
    pub qualifying_children: u32,
    pub phase_in_amount: Money,
    pub phase_out_income: Money,
    pub phase_out_reduction: Money,
    pub credit: Money,
}

/// Returns `None` when the filer cannot claim the credit at all.
pub fn compute_earned_income_credit(
    input: &EarnedIncomeCreditInput,
) -> Option<EarnedIncomeCreditResult> {
    if input.filing_status == FilingStatusCode::MarriedFilingSeparately
        || input.investment_income > INVESTMENT_INCOME_LIMIT
        || !input.earned_income.is_positive()
    {
        return None;
    }
    if input.qualifying_children == 0
        && !input
            .filer_ages
            .iter()
            .any(|age| (NO_CHILD_MIN_AGE..=NO_CHILD_MAX_AGE).contains(age))
    {
        return None;
    }

    let index = input.qualifying_children.min(3) as usize;
    let params = &PARAMETERS[index];
    let phase_out_start = if input.filing_status == FilingStatusCode::MarriedFilingJointly {
        params.phase_out_start_joint
    } else {
        params.phase_out_start
    };

    let phase_in_amount = input.earned_income.mul_rate(params.phase_in_rate).min(params.max_credit);
    let phase_out_income = input.earned_income.max(input.agi);
    let phase_out_reduction = (phase_out_income - phase_out_start)
        .max_zero()
        .mul_rate(params.phase_out_rate);
    let credit = (phase_in_amount - phase_out_reduction).max_zero();

    if credit.is_zero() {
        return None;
    }
    Some(EarnedIncomeCreditResult {
        qualifying_children: input.qualifying_children,
        phase_in_amount,
        phase_out_income,
        phase_out_reduction,
        credit,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn input(
        children: u32,
        earned: i64,
    ) -> EarnedIncomeCreditInput {
        EarnedIncomeCreditInput {
            filing_status: FilingStatusCode::HeadOfHousehold,
            qualifying_children: children,
            earned_income: Money::dollars(earned),
            agi: Money::dollars(earned),
            investment_income: Money::ZERO,
            filer_ages: vec![35],
        }
    }

    #[test]
    fn plateau_pays_maximum() {
        let result = compute_earned_income_credit(&input(2, 20_000)).unwrap();

        assert_eq!(result.credit, Money::dollars(7_152));
    }

    #[test]
    fn phase_in_below_plateau() {
        let result = compute_earned_income_credit(&input(1, 10_000)).unwrap();

        assert_eq!(result.credit, Money::dollars(3_400));
    }

    #[test]
    fn phase_out_uses_larger_of_earned_income_and_agi() {
        let mut with_interest = input(1, 25_000);
        with_interest.agi = Money::dollars(27_350);

        let result = compute_earned_income_credit(&with_interest).unwrap();

        // 4,328 − 15.98% × 4,000
        assert_eq!(result.credit, Money::from_cents(368_880));
    }

    #[test]
    fn ineligible_cases_are_none() {
        let separate = EarnedIncomeCreditInput {
            filing_status: FilingStatusCode::MarriedFilingSeparately,
            ..input(1, 10_000)
        };
        let investor = EarnedIncomeCreditInput {
            investment_income: Money::dollars(12_000),
            ..input(1, 10_000)
        };
        let too_young = EarnedIncomeCreditInput {
            filer_ages: vec![22],
            ..input(0, 8_000)
        };

        assert_eq!(compute_earned_income_credit(&separate), None);
        assert_eq!(compute_earned_income_credit(&investor), None);
        assert_eq!(compute_earned_income_credit(&too_young), None);
    }

    #[test]
    fn fully_phased_out_is_none() {
        assert_eq!(compute_earned_income_credit(&input(0, 30_000)), None);
    }
}
