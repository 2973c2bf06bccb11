//! Health savings account deduction and additional taxes (Form 8889).

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{HdhpCoverage, HsaAccount};

const SELF_ONLY_LIMIT: Money = Money::dollars(4_300);
const FAMILY_LIMIT: Money = Money::dollars(8_550);
const CATCH_UP: Money = Money::dollars(1_000);
const CATCH_UP_AGE: i32 = 55;
const PENALTY_FREE_AGE: i32 = 65;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsaInput<'a> {
    pub account: &'a HsaAccount,
    pub age_at_year_end: i32,
    pub is_disabled: bool,
    /// W-2 box 12 code W for the account holder.
    pub w2_employer_contributions: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsaResult {
    pub account_id: String,
    /// Line 3 plus the line 7 catch-up, prorated by months of coverage.
    pub contribution_limit: Money,
    /// Line 9
    pub employer_contributions: Money,
    /// Line 2
    pub personal_contributions: Money,
    /// Line 13: flows to Schedule 1, line 13.
    pub deduction: Money,
    /// Total contributions over the limit.
    pub excess_contributions: Money,
    /// 6% excise tax on the excess (Form 5329).
    pub excess_contribution_tax: Money,
    /// Line 16: flows to Schedule 1, line 8f.
    pub taxable_distributions: Money,
    /// Line 17b: 20% additional tax, waived at 65 or when disabled.
    pub additional_tax: Money,
}

fn annual_limit(
    coverage: HdhpCoverage,
    age_at_year_end: i32,
) -> Money {
    let base = match coverage {
        HdhpCoverage::SelfOnly => SELF_ONLY_LIMIT,
        HdhpCoverage::Family => FAMILY_LIMIT,
    };
    if age_at_year_end >= CATCH_UP_AGE {
        base + CATCH_UP
    } else {
        base
    }
}

/// Returns `None` for an account with no contributions and no distributions.
pub fn compute_hsa(input: &HsaInput<'_>) -> Option<HsaResult> {
    let account = input.account;
    let employer_contributions = input.w2_employer_contributions.max_zero()
        + account.other_employer_contributions.max_zero();
    let personal_contributions = account.personal_contributions.max_zero();
    let distributions = account.distributions.max_zero();

    if personal_contributions.is_zero()
        && employer_contributions.is_zero()
        && distributions.is_zero()
    {
        return None;
    }

    let months = account.months_covered.map_or(12, |m| i64::from(m.min(12)));
    let contribution_limit = annual_limit(account.coverage, input.age_at_year_end)
        .scale(Money::from_cents(months), Money::from_cents(12));

    let room = (contribution_limit - employer_contributions).max_zero();
    let deduction = personal_contributions.min(room);
    let excess_contributions =
        (personal_contributions + employer_contributions - contribution_limit).max_zero();

    let taxable_distributions =
        (distributions - account.qualified_medical_expenses.max_zero()).max_zero();
    let penalty_waived = input.age_at_year_end >= PENALTY_FREE_AGE || input.is_disabled;
    let additional_tax = if penalty_waived {
        Money::ZERO
    } else {
        taxable_distributions.mul_rate(dec!(0.20))
    };

    Some(HsaResult {
        account_id: account.id.clone(),
        contribution_limit,
        employer_contributions,
        personal_contributions,
        deduction,
        excess_contributions,
        excess_contribution_tax: excess_contributions.mul_rate(dec!(0.06)),
        taxable_distributions,
        additional_tax,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn account() -> HsaAccount {
        HsaAccount {
            id: "hsa-1".into(),
            coverage: HdhpCoverage::SelfOnly,
            personal_contributions: Money::dollars(3_000),
            ..Default::default()
        }
    }

    fn input(account: &HsaAccount) -> HsaInput<'_> {
        HsaInput {
            account,
            age_at_year_end: 40,
            is_disabled: false,
            w2_employer_contributions: Money::ZERO,
        }
    }

    #[test]
    fn empty_account_is_not_applicable() {
        let account = HsaAccount::default();

        assert_eq!(compute_hsa(&input(&account)), None);
    }

    #[test]
    fn employer_contributions_use_up_room() {
        let account = account();
        let result = compute_hsa(&HsaInput {
            w2_employer_contributions: Money::dollars(2_000),
            ..input(&account)
        })
        .unwrap();

        assert_eq!(result.deduction, Money::dollars(2_300));
        assert_eq!(result.excess_contributions, Money::dollars(700));
        assert_eq!(result.excess_contribution_tax, Money::dollars(42));
    }

    #[test]
    fn catch_up_at_55_with_family_coverage() {
        let account = HsaAccount {
            coverage: HdhpCoverage::Family,
            personal_contributions: Money::dollars(9_550),
            ..account()
        };
        let result = compute_hsa(&HsaInput {
            age_at_year_end: 55,
            ..input(&account)
        })
        .unwrap();

        assert_eq!(result.contribution_limit, Money::dollars(9_550));
        assert_eq!(result.deduction, Money::dollars(9_550));
        assert_eq!(result.excess_contributions, Money::ZERO);
    }

    #[test]
    fn partial_year_coverage_prorates_limit() {
        let account = HsaAccount {
            months_covered: Some(6),
            ..account()
        };

        let result = compute_hsa(&input(&account)).unwrap();

        assert_eq!(result.contribution_limit, Money::dollars(2_150));
        assert_eq!(result.deduction, Money::dollars(2_150));
    }

    #[test]
    fn zero_months_of_coverage_makes_every_contribution_excess() {
        let account = HsaAccount {
            months_covered: Some(0),
            ..account()
        };

        let result = compute_hsa(&input(&account)).unwrap();

        assert_eq!(result.contribution_limit, Money::ZERO);
        assert_eq!(result.deduction, Money::ZERO);
        assert_eq!(result.excess_contributions, account.personal_contributions);
    }

    #[test]
    fn nonqualified_distribution_penalty() {
        let account = HsaAccount {
            distributions: Money::dollars(1_500),
            qualified_medical_expenses: Money::dollars(500),
            ..account()
        };

        let result = compute_hsa(&input(&account)).unwrap();

        assert_eq!(result.taxable_distributions, Money::dollars(1_000));
        assert_eq!(result.additional_tax, Money::dollars(200));
    }

    #[test]
    fn penalty_waived_at_65_and_when_disabled() {
        let account = HsaAccount {
            distributions: Money::dollars(1_000),
            ..account()
        };

        let senior = compute_hsa(&HsaInput {
            age_at_year_end: 65,
            ..input(&account)
        })
        .unwrap();
        let disabled = compute_hsa(&HsaInput {
            is_disabled: true,
            ..input(&account)
        })
        .unwrap();

        assert_eq!(senior.taxable_distributions, Money::dollars(1_000));
        assert_eq!(senior.additional_tax, Money::ZERO);
        assert_eq!(disabled.additional_tax, Money::ZERO);
    }
}
