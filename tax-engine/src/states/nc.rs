//! North Carolina individual income tax return (D-400).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{FilingStatusCode, StateCode};
use crate::states::common::{self, StateTotals};
use crate::states::{
    ReviewSection, StateComputeResult, StateContext, StateDetail, StateMetadata, StateRulesModule,
};
use crate::trace::{TraceError, TraceScope};

static METADATA: StateMetadata = StateMetadata {
    code: StateCode::NC,
    name: "North Carolina",
    form_name: "D-400",
    node_prefix: "d400",
    template_files: &["nc/d-400.pdf", "nc/d-400-schedule-s.pdf", "nc/d-400-schedule-pn.pdf"],
};

const LABELS: &[(&str, &str)] = &[
    ("additions", "Additions to federal AGI"),
    ("subtractions", "Deductions from federal AGI"),
    ("ncAgi", "North Carolina AGI"),
    ("standardDeduction", "NC standard deduction"),
    ("childDeduction", "Child deduction"),
    ("taxableIncome", "North Carolina taxable income"),
    ("fullYearTax", "Tax before apportionment"),
    ("credits", "Tax credits"),
    ("refundableCredits", "Refundable credits"),
];

static REVIEW: &[ReviewSection] = &[
    ReviewSection {
        title: "Income",
        keys: &["additions", "subtractions", "ncAgi"],
    },
    ReviewSection {
        title: "Tax",
        keys: &["standardDeduction", "childDeduction", "taxableIncome", "tax", "netTax"],
    },
    ReviewSection {
        title: "Payments",
        keys: &["withholding", "estimatedPayments", "overpaid", "owed"],
    },
];

const RATE: Decimal = dec!(0.0425);

fn standard_deduction(status: FilingStatusCode) -> Money {
    match status {
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
            Money::dollars(12_750)
        }
        FilingStatusCode::MarriedFilingJointly | FilingStatusCode::QualifyingSurvivingSpouse => {
            Money::dollars(25_500)
        }
        FilingStatusCode::HeadOfHousehold => Money::dollars(19_125),
    }
}

/// Deduction per qualifying child, stepping down by $500 per AGI tier.
const CHILD_DEDUCTION_STEPS: [i64; 6] = [3_000, 2_500, 2_000, 1_500, 1_000, 500];

/// Upper AGI bound of each tier, in dollars.
fn child_deduction_tiers(status: FilingStatusCode) -> [i64; 6] {
    match status {
        FilingStatusCode::MarriedFilingJointly | FilingStatusCode::QualifyingSurvivingSpouse => {
            [40_000, 60_000, 80_000, 100_000, 120_000, 140_000]
        }
        FilingStatusCode::HeadOfHousehold => [30_000, 45_000, 60_000, 75_000, 90_000, 105_000],
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
            [20_000, 30_000, 40_000, 50_000, 60_000, 70_000]
        }
    }
}

/// Child deduction for one qualifying child at federal AGI `agi`.
pub fn child_deduction_per_child(
    status: FilingStatusCode,
    agi: Money,
) -> Money {
    child_deduction_tiers(status)
        .iter()
        .zip(CHILD_DEDUCTION_STEPS)
        .find(|(limit, _)| agi <= Money::dollars(**limit))
        .map_or(Money::ZERO, |(_, amount)| Money::dollars(amount))
}

/// Child deduction for `children` qualifying children. Saturates rather
/// than wrapping for implausibly large counts.
pub fn total_child_deduction(
    per_child: Money,
    children: usize,
) -> Money {
    let children = i64::try_from(children).unwrap_or(i64::MAX);
    Money::from_cents(per_child.cents().saturating_mul(children))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NcDetail {
    pub additions: Money,
    pub subtractions: Money,
    pub standard_deduction: Money,
    pub qualifying_children: usize,
    pub child_deduction: Money,
    pub full_year_tax: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NorthCarolina;

impl StateRulesModule for NorthCarolina {
    fn metadata(&self) -> &'static StateMetadata {
        &METADATA
    }

    fn node_labels(&self) -> &'static [(&'static str, &'static str)] {
        LABELS
    }

    fn review_layout(&self) -> &'static [ReviewSection] {
        REVIEW
    }

    fn compute(
        &self,
        ctx: &StateContext<'_>,
        scope: &mut TraceScope<'_>,
    ) -> Result<StateComputeResult, TraceError> {
        let form = ctx.form1040();
        let status = ctx.filing_status();
        let year = ctx.tax_year();
        let (ratio, notice) = common::apportionment(ctx.config, year);
        let warnings: Vec<_> = notice.into_iter().collect();

        let municipal = common::other_state_municipal_interest(ctx, scope, LABELS)?;
        let additions = scope.sum("additions", [&municipal], self.label("additions"))?;
        let us_interest = common::us_obligation_interest(ctx, scope, LABELS)?;
        let subtractions = scope.sum(
            "subtractions",
            [&form.line6b, &us_interest],
            self.label("subtractions"),
        )?;
        let nc_agi = scope.record(
            "ncAgi",
            form.line11.amount + additions.amount - subtractions.amount,
            [form.line11.id(), additions.id(), subtractions.id()],
            self.label("ncAgi"),
        )?;

        let standard = scope.input(
            "standardDeduction",
            standard_deduction(status),
            self.label("standardDeduction"),
        )?;
        let qualifying_children = ctx
            .tax_return
            .dependents
            .iter()
            .filter(|d| d.is_child_tax_credit_child(year))
            .count();
        let per_child = child_deduction_per_child(status, form.line11.amount);
        let child_deduction = scope.record(
            "childDeduction",
            total_child_deduction(per_child, qualifying_children),
            [form.line11.id()],
            self.label("childDeduction"),
        )?;

        let taxable_income = scope.record(
            "taxableIncome",
            (nc_agi.amount - standard.amount - child_deduction.amount).max_zero(),
            [nc_agi.id(), standard.id(), child_deduction.id()],
            self.label("taxableIncome"),
        )?;
        let full_year_tax = scope.record(
            "fullYearTax",
            taxable_income.amount.mul_rate(RATE),
            [taxable_income.id()],
            self.label("fullYearTax"),
        )?;
        let tax = common::apportion(scope, "tax", &full_year_tax, ratio, &self.label("tax"))?;
        let credits = scope.input("credits", Money::ZERO, self.label("credits"))?;
        let refundable_credits = scope.input(
            "refundableCredits",
            Money::ZERO,
            self.label("refundableCredits"),
        )?;

        let detail = NcDetail {
            additions: additions.amount,
            subtractions: subtractions.amount,
            standard_deduction: standard.amount,
            qualifying_children,
            child_deduction: child_deduction.amount,
            full_year_tax: full_year_tax.amount,
        };
        common::settle(
            ctx,
            scope,
            METADATA.form_name,
            ratio,
            StateTotals {
                state_agi: nc_agi,
                taxable_income,
                tax,
                nonrefundable_credits: credits,
                refundable_credits,
            },
            StateDetail::NC(detail),
            warnings,
        )
    }
}
