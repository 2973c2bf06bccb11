//! Traditional IRA deduction (Schedule 1, line 20).
//!
//! The phase-out is measured against a caller-supplied MAGI. The federal
//! aggregator passes total income (Form 1040 line 9), which does not yet
//! include this deduction; passing AGI here would make AGI depend on itself.

use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::calculations::phase_out::PhaseOut;
use crate::models::FilingStatusCode;

const BASE_LIMIT: Money = Money::dollars(7_000);
const CATCH_UP: Money = Money::dollars(1_000);
const CATCH_UP_AGE: i32 = 50;
/// A reduced limit above zero but under this is raised to it.
const MINIMUM_REDUCED_LIMIT: Money = Money::dollars(200);
const ROUNDING_UNIT: Money = Money::dollars(10);

/// Who is covered by a workplace retirement plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanCoverage {
    /// The contributor is covered.
    Covered,
    /// Only the contributor's spouse is covered.
    SpouseCovered,
    Neither,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IraDeductionInput {
    pub filing_status: FilingStatusCode,
    pub contribution: Money,
    pub age_at_year_end: i32,
    pub coverage: PlanCoverage,
    /// Taxable compensation available to support the contribution.
    pub compensation: Money,
    /// Total income before this deduction.
    pub magi: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IraDeductionResult {
    pub contribution: Money,
    pub coverage: PlanCoverage,
    /// Age-based limit, capped at compensation.
    pub limit: Money,
    /// Phase-out range applied, if any.
    pub phase_out: Option<PhaseOut>,
    /// Limit after the phase-out.
    pub reduced_limit: Money,
    pub deduction: Money,
    pub nondeductible: Money,
    /// Contributions above the age-based limit.
    pub excess_contribution: Money,
}

/// Phase-out range for the filer's coverage, or `None` when no one is covered.
pub fn phase_out_range(
    status: FilingStatusCode,
    coverage: PlanCoverage,
) -> Option<PhaseOut> {
    let (start, end) = match (coverage, status) {
        (PlanCoverage::Neither, _) => return None,
        (_, FilingStatusCode::MarriedFilingSeparately) => (0, 10_000),
        (PlanCoverage::Covered, FilingStatusCode::MarriedFilingJointly)
        | (PlanCoverage::Covered, FilingStatusCode::QualifyingSurvivingSpouse) => {
            (126_000, 146_000)
        }
        (PlanCoverage::Covered, _) => (79_000, 89_000),
        (PlanCoverage::SpouseCovered, FilingStatusCode::MarriedFilingJointly) => {
            (236_000, 246_000)
        }
        // A spouse's plan only matters on a married return.
        (PlanCoverage::SpouseCovered, _) => return None,
    };
    Some(PhaseOut::new(
        Money::dollars(start),
        Money::dollars(end),
        ROUNDING_UNIT,
    ))
}

/// Age-based contribution limit.
pub fn contribution_limit(age_at_year_end: i32) -> Money {
    if age_at_year_end >= CATCH_UP_AGE {
        BASE_LIMIT + CATCH_UP
    } else {
        BASE_LIMIT
    }
}

/// Returns `None` when there is no traditional contribution.
pub fn compute_ira_deduction(input: &IraDeductionInput) -> Option<IraDeductionResult> {
    if !input.contribution.is_positive() {
        return None;
    }

    let age_limit = contribution_limit(input.age_at_year_end);
    let limit = age_limit.min(input.compensation.max_zero());
    let phase_out = phase_out_range(input.filing_status, input.coverage);

    let reduced_limit = match phase_out {
        Some(range) => {
            let reduced = range.apply(limit, input.magi);
            if reduced.is_positive() && reduced < MINIMUM_REDUCED_LIMIT {
                MINIMUM_REDUCED_LIMIT.min(limit)
            } else {
                reduced
            }
        }
        None => limit,
    };

    let deduction = input.contribution.min(reduced_limit);
    Some(IraDeductionResult {
        contribution: input.contribution,
        coverage: input.coverage,
        limit,
        phase_out,
        reduced_limit,
        deduction,
        nondeductible: input.contribution.min(limit) - deduction,
        excess_contribution: (input.contribution - age_limit).max_zero(),
    })
}
