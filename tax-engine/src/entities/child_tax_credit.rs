//! Child tax credit, credit for other dependents and additional child tax
//! credit (Schedule 8812).

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::calculations::phase_out::SteppedPhaseOut;
use crate::models::FilingStatusCode;

const CREDIT_PER_CHILD: Money = Money::dollars(2_200);
const CREDIT_PER_OTHER_DEPENDENT: Money = Money::dollars(500);
const REFUNDABLE_PER_CHILD: Money = Money::dollars(1_700);
const EARNED_INCOME_FLOOR: Money = Money::dollars(2_500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTaxCreditInput {
    pub filing_status: FilingStatusCode,
    pub qualifying_children: u32,
    pub other_dependents: u32,
    /// AGI (no foreign exclusions are modelled).
    pub magi: Money,
    /// Form 1040 line 18.
    pub tax_liability: Money,
    pub earned_income: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildTaxCreditResult {
    /// Lines 5 + 7
    pub initial_credit: Money,
    /// Line 10
    pub phase_out_reduction: Money,
    /// Line 12
    pub credit_after_phase_out: Money,
    /// Line 14: flows to Form 1040 line 19.
    pub nonrefundable_credit: Money,
    /// Line 27: flows to Form 1040 line 28.
    pub additional_child_tax_credit: Money,
}

pub fn phase_out(status: FilingStatusCode) -> SteppedPhaseOut {
    let threshold = if status == FilingStatusCode::MarriedFilingJointly {
        Money::dollars(400_000)
    } else {
        Money::dollars(200_000)
    };
    SteppedPhaseOut::new(threshold, Money::dollars(1_000), Money::dollars(50))
}

/// Returns `None` when there are no qualifying children or other dependents.
pub fn compute_child_tax_credit(input: &ChildTaxCreditInput) -> Option<ChildTaxCreditResult> {
    if input.qualifying_children == 0 && input.other_dependents == 0 {
        return None;
    }

    let children = i64::from(input.qualifying_children);
    let initial_credit = Money::from_cents(
        CREDIT_PER_CHILD.cents() * children
            + CREDIT_PER_OTHER_DEPENDENT.cents() * i64::from(input.other_dependents),
    );
    let phase_out_reduction = phase_out(input.filing_status)
        .reduction(input.magi)
        .min(initial_credit);
    let credit_after_phase_out = (initial_credit - phase_out_reduction).max_zero();
    let nonrefundable_credit = credit_after_phase_out.min(input.tax_liability.max_zero());

    let unused = credit_after_phase_out - nonrefundable_credit;
    let refundable_cap = Money::from_cents(REFUNDABLE_PER_CHILD.cents() * children);
    let earned_income_portion = (input.earned_income - EARNED_INCOME_FLOOR)
        .max_zero()
        .mul_rate(dec!(0.15));
    let additional_child_tax_credit = unused.min(refundable_cap).min(earned_income_portion);

    Some(ChildTaxCreditResult {
        initial_credit,
        phase_out_reduction,
        credit_after_phase_out,
        nonrefundable_credit,
        additional_child_tax_credit,
    })
}
