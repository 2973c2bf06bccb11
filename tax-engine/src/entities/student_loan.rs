//! Student loan interest deduction (Schedule 1, line 21).

use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::calculations::phase_out::PhaseOut;
use crate::models::FilingStatusCode;

const MAX_DEDUCTION: Money = Money::dollars(2_500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLoanInterestResult {
    pub interest_paid: Money,
    pub tentative: Money,
    pub phase_out: PhaseOut,
    pub deduction: Money,
}

pub fn phase_out_range(status: FilingStatusCode) -> Option<PhaseOut> {
    let (start, end) = match status {
        FilingStatusCode::MarriedFilingSeparately => return None,
        FilingStatusCode::MarriedFilingJointly => (170_000, 200_000),
        _ => (85_000, 100_000),
    };
    Some(PhaseOut::new(
        Money::dollars(start),
        Money::dollars(end),
        Money::ZERO,
    ))
}

/// `magi` is AGI figured without this deduction.
///
/// Returns `None` when no interest was paid or the status cannot claim it.
pub fn compute_student_loan_interest(
    status: FilingStatusCode,
    interest_paid: Money,
    magi: Money,
) -> Option<StudentLoanInterestResult> {
    if !interest_paid.is_positive() {
        return None;
    }
    let phase_out = phase_out_range(status)?;
    let tentative = interest_paid.min(MAX_DEDUCTION);
    Some(StudentLoanInterestResult {
        interest_paid,
        tentative,
        phase_out,
        deduction: phase_out.apply(tentative, magi),
    })
}
