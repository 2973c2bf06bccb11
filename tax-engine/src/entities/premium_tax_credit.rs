//! Premium tax credit reconciliation (Form 8962).
//!
//! Monthly rows from every 1095-A are combined per month. A month that
//! appears on more than one statement sums its enrollment premium and
//! advance payments but takes the largest benchmark premium, because the
//! benchmark describes the market rather than any one policy.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::bands::{PercentageBand, interpolate_rate};
use crate::calculations::common::{Money, round_ratio};
use crate::models::{FilingStatusCode, MarketplaceMonth, MarketplaceStatement};

/// Federal poverty line used for 2025 coverage (48 contiguous states).
const POVERTY_LINE_BASE: Money = Money::dollars(15_060);
const POVERTY_LINE_PER_PERSON: Money = Money::dollars(5_380);

/// Applicable figure by percentage of the poverty line.
const APPLICABLE_PERCENTAGE_BANDS: [PercentageBand; 6] = [
    PercentageBand::new(dec!(0), dec!(150), dec!(0), dec!(0)),
    PercentageBand::new(dec!(150), dec!(200), dec!(0), dec!(0.02)),
    PercentageBand::new(dec!(200), dec!(250), dec!(0.02), dec!(0.04)),
    PercentageBand::new(dec!(250), dec!(300), dec!(0.04), dec!(0.06)),
    PercentageBand::new(dec!(300), dec!(400), dec!(0.06), dec!(0.085)),
    PercentageBand::new(dec!(400), dec!(100000), dec!(0.085), dec!(0.085)),
];

/// Repayment limitation: (below this % of poverty, single cap, other cap).
const REPAYMENT_CAPS: [(i64, Money, Money); 3] = [
    (200, Money::dollars(375), Money::dollars(750)),
    (300, Money::dollars(975), Money::dollars(1_950)),
    (400, Money::dollars(1_625), Money::dollars(3_250)),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumTaxCreditInput<'a> {
    pub statements: &'a [MarketplaceStatement],
    pub filing_status: FilingStatusCode,
    pub household_size: usize,
    /// AGI plus tax-exempt interest and non-taxable Social Security.
    pub household_income: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtcMonth {
    pub month: u32,
    pub enrollment_premium: Money,
    pub benchmark_premium: Money,
    pub contribution: Money,
    pub credit: Money,
    pub advance_credit: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumTaxCreditResult {
    /// Line 4
    pub poverty_line: Money,
    /// Line 5: whole percent, truncated.
    pub poverty_percentage: i64,
    /// Line 7
    pub applicable_figure: Decimal,
    /// Line 8a
    pub annual_contribution: Money,
    /// Line 8b
    pub monthly_contribution: Money,
    pub months: Vec<PtcMonth>,
    /// Line 24
    pub total_credit: Money,
    /// Line 25
    pub total_advance_credit: Money,
    /// Line 26: flows to Schedule 3, line 9.
    pub net_credit: Money,
    /// Line 27
    pub excess_advance_credit: Money,
    /// Line 28; `None` at or above 400% of the poverty line.
    pub repayment_limit: Option<Money>,
    /// Line 29: flows to Schedule 2, line 2.
    pub repayment: Money,
    /// Married filing separately without an exception cannot take the credit.
    pub eligible: bool,
}

pub fn poverty_line(household_size: usize) -> Money {
    let extra = i64::try_from(household_size.max(1) - 1).unwrap_or(0);
    POVERTY_LINE_BASE + Money::from_cents(POVERTY_LINE_PER_PERSON.cents() * extra)
}

/// Combines every statement's rows into one row per month.
pub fn merge_months(statements: &[MarketplaceStatement]) -> BTreeMap<u32, MarketplaceMonth> {
    let mut months: BTreeMap<u32, MarketplaceMonth> = BTreeMap::new();
    for row in statements.iter().flat_map(|s| s.months.iter()) {
        if !(1..=12).contains(&row.month) {
            continue;
        }
        let merged = months.entry(row.month).or_insert_with(|| MarketplaceMonth {
            month: row.month,
            ..Default::default()
        });
        merged.enrollment_premium += row.enrollment_premium;
        merged.advance_credit += row.advance_credit;
        merged.benchmark_premium = merged.benchmark_premium.max(row.benchmark_premium);
    }
    months
}

fn repayment_limit(
    status: FilingStatusCode,
    poverty_percentage: i64,
) -> Option<Money> {
    REPAYMENT_CAPS
        .iter()
        .find(|(below, _, _)| poverty_percentage < *below)
        .map(|(_, single, other)| {
            if status == FilingStatusCode::Single {
                *single
            } else {
                *other
            }
        })
}

/// Returns `None` when no marketplace coverage was reported.
pub fn compute_premium_tax_credit(
    input: &PremiumTaxCreditInput<'_>,
) -> Option<PremiumTaxCreditResult> {
    let months = merge_months(input.statements);
    if months.is_empty() {
        return None;
    }

    let poverty_line = poverty_line(input.household_size);
    let poverty_percentage = (input.household_income.max_zero().to_decimal() * dec!(100)
        / poverty_line.to_decimal())
    .trunc()
    .try_into()
    .unwrap_or(i64::MAX);

    let received_advance = months.values().any(|m| m.advance_credit.is_positive());
    let eligible = input.filing_status != FilingStatusCode::MarriedFilingSeparately
        && (poverty_percentage >= 100 || received_advance);

    let applicable_figure = round_ratio(
        interpolate_rate(
            &APPLICABLE_PERCENTAGE_BANDS,
            Decimal::from(poverty_percentage),
        ),
        4,
    );
    let annual_contribution = input.household_income.max_zero().mul_rate(applicable_figure);
    let monthly_contribution = annual_contribution.scale(
        Money::from_cents(1),
        Money::from_cents(12),
    );

    let months: Vec<PtcMonth> = months
        .into_values()
        .map(|m| {
            let credit = if eligible {
                (m.benchmark_premium - monthly_contribution)
                    .min(m.enrollment_premium)
                    .max_zero()
            } else {
                Money::ZERO
            };
            PtcMonth {
                month: m.month,
                enrollment_premium: m.enrollment_premium,
                benchmark_premium: m.benchmark_premium,
                contribution: monthly_contribution,
                credit,
                advance_credit: m.advance_credit,
            }
        })
        .collect();

    let total_credit: Money = months.iter().map(|m| m.credit).sum();
    let total_advance_credit: Money = months.iter().map(|m| m.advance_credit).sum();
    let net_credit = (total_credit - total_advance_credit).max_zero();
    let excess_advance_credit = (total_advance_credit - total_credit).max_zero();
    let repayment_limit = repayment_limit(input.filing_status, poverty_percentage);
    let repayment = match repayment_limit {
        Some(limit) => excess_advance_credit.min(limit),
        None => excess_advance_credit,
    };

    Some(PremiumTaxCreditResult {
        poverty_line,
        poverty_percentage,
        applicable_figure,
        annual_contribution,
        monthly_contribution,
        months,
        total_credit,
        total_advance_credit,
        net_credit,
        excess_advance_credit,
        repayment_limit,
        repayment,
        eligible,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn statement(
        id: &str,
        enrollment: i64,
        benchmark: i64,
        advance: i64,
    ) -> MarketplaceStatement {
        MarketplaceStatement {
            id: id.into(),
            policy_number: String::new(),
            months: (1..=12)
                .map(|month| MarketplaceMonth {
                    month,
                    enrollment_premium: Money::dollars(enrollment),
                    benchmark_premium: Money::dollars(benchmark),
                    advance_credit: Money::dollars(advance),
                })
                .collect(),
        }
    }

    fn input(
        statements: &[MarketplaceStatement],
        income: i64,
    ) -> PremiumTaxCreditInput<'_> {
        PremiumTaxCreditInput {
            statements,
            filing_status: FilingStatusCode::Single,
            household_size: 1,
            household_income: Money::dollars(income),
        }
    }

    #[test]
    fn no_statements_is_not_applicable() {
        assert_eq!(compute_premium_tax_credit(&input(&[], 25_000)), None);
    }

    #[test]
    fn low_income_gets_full_credit_without_advance() {
        let statements = [statement("1095a-1", 400, 500, 0)];

        let result = compute_premium_tax_credit(&input(&statements, 25_000)).unwrap();

        assert_eq!(result.poverty_percentage, 166);
        assert_eq!(result.applicable_figure, dec!(0.0064));
        assert_eq!(result.annual_contribution, Money::dollars(160));
        assert_eq!(result.total_credit, Money::dollars(4_800));
        assert_eq!(result.net_credit, Money::dollars(4_800));
        assert_eq!(result.repayment, Money::ZERO);
    }

    #[test]
    fn excess_advance_repayment_is_capped() {
        let statements = [statement("1095a-1", 600, 500, 500)];

        let result = compute_premium_tax_credit(&input(&statements, 40_000)).unwrap();

        assert_eq!(result.poverty_percentage, 265);
        assert!(result.excess_advance_credit > Money::dollars(975));
        assert_eq!(result.repayment_limit, Some(Money::dollars(975)));
        assert_eq!(result.repayment, Money::dollars(975));
        assert_eq!(result.net_credit, Money::ZERO);
    }

    #[test]
    fn repayment_uncapped_at_400_percent() {
        let statements = [statement("1095a-1", 600, 500, 500)];

        let result = compute_premium_tax_credit(&input(&statements, 70_000)).unwrap();

        assert_eq!(result.repayment_limit, None);
        assert_eq!(result.repayment, result.excess_advance_credit);
    }

    #[test]
    fn duplicate_months_sum_premiums_but_take_max_benchmark() {
        let statements = [
            statement("1095a-1", 200, 500, 50),
            statement("1095a-2", 150, 450, 25),
        ];

        let months = merge_months(&statements);
        let january = &months[&1];

        assert_eq!(months.len(), 12);
        assert_eq!(january.enrollment_premium, Money::dollars(350));
        assert_eq!(january.advance_credit, Money::dollars(75));
        assert_eq!(january.benchmark_premium, Money::dollars(500));
    }

    #[test]
    fn separate_filer_must_repay_everything_it_received() {
        let statements = [statement("1095a-1", 400, 500, 100)];
        let result = compute_premium_tax_credit(&PremiumTaxCreditInput {
            filing_status: FilingStatusCode::MarriedFilingSeparately,
            ..input(&statements, 25_000)
        })
        .unwrap();

        assert!(!result.eligible);
        assert_eq!(result.total_credit, Money::ZERO);
        assert_eq!(result.excess_advance_credit, Money::dollars(1_200));
        assert_eq!(result.repayment, Money::dollars(750));
    }

    #[test]
    fn poverty_line_grows_with_household() {
        assert_eq!(poverty_line(1), Money::dollars(15_060));
        assert_eq!(poverty_line(3), Money::dollars(25_820));
    }
}
