//! Pennsylvania personal income tax return (PA-40).
//!
//! Pennsylvania does not start from federal AGI. Income is taxed in
//! classes, each floored at zero, so a loss in one class never offsets
//! another. Retirement distributions, Social Security and unemployment
//! compensation are not taxable classes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::StateCode;
use crate::states::common::{self, StateTotals};
use crate::states::{
    ReviewSection, StateComputeResult, StateContext, StateDetail, StateMetadata, StateRulesModule,
};
use crate::trace::{NodeId, TraceError, TraceScope};

static METADATA: StateMetadata = StateMetadata {
    code: StateCode::PA,
    name: "Pennsylvania",
    form_name: "PA-40",
    node_prefix: "pa40",
    template_files: &["pa/pa-40.pdf", "pa/pa-40-sp.pdf", "pa/pa-40-schedule-b.pdf"],
};

const LABELS: &[(&str, &str)] = &[
    ("electiveDeferrals", "Elective deferrals (W-2 box 12 code D)"),
    ("compensation", "Gross compensation"),
    ("interest", "Taxable interest"),
    ("dividends", "Taxable dividends"),
    ("netProfits", "Net income from business"),
    ("gains", "Net gains from the sale of property"),
    ("totalIncome", "Total PA taxable income"),
    ("taxableIncome", "Adjusted PA taxable income"),
    ("fullYearTax", "Tax before apportionment"),
    ("eligibilityIncome", "Schedule SP eligibility income"),
    ("forgiveness", "Tax forgiveness"),
    ("credits", "Total credits"),
    ("refundableCredits", "Refundable credits"),
];

static REVIEW: &[ReviewSection] = &[
    ReviewSection {
        title: "Income classes",
        keys: &["compensation", "interest", "dividends", "netProfits", "gains", "totalIncome"],
    },
    ReviewSection {
        title: "Tax",
        keys: &["taxableIncome", "tax", "eligibilityIncome", "forgiveness", "netTax"],
    },
    ReviewSection {
        title: "Payments",
        keys: &["withholding", "estimatedPayments", "overpaid", "owed"],
    },
];

const RATE: Decimal = dec!(0.0307);
const FORGIVENESS_BASE_UNMARRIED: Money = Money::dollars(6_500);
const FORGIVENESS_BASE_MARRIED: Money = Money::dollars(13_000);
const FORGIVENESS_PER_DEPENDENT: Money = Money::dollars(9_500);
const FORGIVENESS_STEP: Money = Money::dollars(250);

/// Schedule SP forgiveness percentage, 0 to 100.
///
/// Full forgiveness at or below the base; each $250 (or part) above it
/// takes away ten points.
pub fn forgiveness_percent(
    married: bool,
    dependents: usize,
    eligibility_income: Money,
) -> i64 {
    let base = if married {
        FORGIVENESS_BASE_MARRIED
    } else {
        FORGIVENESS_BASE_UNMARRIED
    };
    let dependents = i64::try_from(dependents).unwrap_or(i64::MAX);
    let base =
        base + Money::from_cents(FORGIVENESS_PER_DEPENDENT.cents().saturating_mul(dependents));
    let steps = (eligibility_income - base).units_ceil(FORGIVENESS_STEP);
    (100 - steps.saturating_mul(10)).max(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaDetail {
    pub compensation: Money,
    pub interest: Money,
    pub dividends: Money,
    pub net_profits: Money,
    pub gains: Money,
    pub full_year_tax: Money,
    pub eligibility_income: Money,
    pub forgiveness_percent: i64,
    pub forgiveness: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pennsylvania;

impl StateRulesModule for Pennsylvania {
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
        let tax_return = ctx.tax_return;
        let (ratio, notice) = common::apportionment(ctx.config, ctx.tax_year());
        let warnings: Vec<_> = notice.into_iter().collect();

        // Class 1: compensation, with 401(k) deferrals added back.
        let deferrals: Money = tax_return
            .wage_statements
            .iter()
            .map(|w2| w2.box12_total("D"))
            .sum();
        let elective_deferrals = scope.input(
            "electiveDeferrals",
            deferrals,
            self.label("electiveDeferrals"),
        )?;
        let wages: Money = tax_return.wage_statements.iter().map(|w2| w2.wages).sum();
        let mut compensation_inputs: Vec<NodeId> = (0..tax_return.wage_statements.len())
            .map(|i| NodeId::document("w2", i, "box1"))
            .collect();
        compensation_inputs.push(elective_deferrals.id().clone());
        let compensation = scope.record(
            "compensation",
            (wages + elective_deferrals.amount).max_zero(),
            &compensation_inputs,
            self.label("compensation"),
        )?;

        // Class 2: interest, U.S. obligations out, other states' bonds in.
        let us_interest = common::us_obligation_interest(ctx, scope, LABELS)?;
        let municipal = common::other_state_municipal_interest(ctx, scope, LABELS)?;
        let interest = scope.record(
            "interest",
            (form.line2b.amount - us_interest.amount + municipal.amount).max_zero(),
            [form.line2b.id(), us_interest.id(), municipal.id()],
            self.label("interest"),
        )?;

        let dividends = scope.record(
            "dividends",
            form.line3b.amount.max_zero(),
            [form.line3b.id()],
            self.label("dividends"),
        )?;

        let schedules = &ctx.federal.schedules;
        let profit_inputs: Vec<NodeId> = (0..schedules.schedule_c.len())
            .map(|i| NodeId::document("scheduleC", i, "line31"))
            .collect();
        let net_profits = scope.record(
            "netProfits",
            schedules.business_profit().max_zero(),
            &profit_inputs,
            self.label("netProfits"),
        )?;

        let net_gain = schedules.schedule_d.as_ref().map_or(Money::ZERO, |d| d.net_gain);
        let gains = scope.record(
            "gains",
            net_gain.max_zero(),
            [form.line7.id()],
            self.label("gains"),
        )?;

        let total_income = scope.sum(
            "totalIncome",
            [&compensation, &interest, &dividends, &net_profits, &gains],
            self.label("totalIncome"),
        )?;
        let taxable_income = scope.record(
            "taxableIncome",
            total_income.amount,
            [total_income.id()],
            self.label("taxableIncome"),
        )?;
        let full_year_tax = scope.record(
            "fullYearTax",
            taxable_income.amount.mul_rate(RATE),
            [taxable_income.id()],
            self.label("fullYearTax"),
        )?;
        let tax = common::apportion(scope, "tax", &full_year_tax, ratio, &self.label("tax"))?;

        // Schedule SP counts nontaxable interest toward eligibility.
        let eligibility_income = scope.record(
            "eligibilityIncome",
            taxable_income.amount + form.line2a.amount,
            [taxable_income.id(), form.line2a.id()],
            self.label("eligibilityIncome"),
        )?;
        let percent = forgiveness_percent(
            ctx.filing_status().is_married(),
            tax_return.dependents.len(),
            eligibility_income.amount,
        );
        let forgiveness = scope.record(
            "forgiveness",
            tax.amount.mul_rate(Decimal::new(percent, 2)),
            [tax.id(), eligibility_income.id()],
            self.label("forgiveness"),
        )?;
        let credits = scope.sum("credits", [&forgiveness], self.label("credits"))?;
        let refundable_credits = scope.input(
            "refundableCredits",
            Money::ZERO,
            self.label("refundableCredits"),
        )?;

        let detail = PaDetail {
            compensation: compensation.amount,
            interest: interest.amount,
            dividends: dividends.amount,
            net_profits: net_profits.amount,
            gains: gains.amount,
            full_year_tax: full_year_tax.amount,
            eligibility_income: eligibility_income.amount,
            forgiveness_percent: percent,
            forgiveness: forgiveness.amount,
        };
        common::settle(
            ctx,
            scope,
            METADATA.form_name,
            ratio,
            StateTotals {
                state_agi: total_income,
                taxable_income,
                tax,
                nonrefundable_credits: credits,
                refundable_credits,
            },
            StateDetail::PA(detail),
            warnings,
        )
    }
}
