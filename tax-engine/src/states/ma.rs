//! Massachusetts resident income tax return (Form 1).
//!
//! Part B and Part C income are not separated: all income is taxed at the
//! Part B rate, with the surtax on the combined total.

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
    code: StateCode::MA,
    name: "Massachusetts",
    form_name: "Form 1",
    node_prefix: "form1",
    template_files: &["ma/form-1.pdf", "ma/schedule-y.pdf", "ma/schedule-nts-l-nr-py.pdf"],
};

const LABELS: &[(&str, &str)] = &[
    ("additions", "Interest on other states' obligations"),
    ("subtractions", "Subtractions"),
    ("maAgi", "Massachusetts AGI"),
    ("exemptions", "Personal exemptions"),
    ("rentalDeduction", "Rental deduction"),
    ("taxableIncome", "Taxable income"),
    ("baseTax", "Tax at 5%"),
    ("surtax", "4% surtax on income over the threshold"),
    ("fullYearTax", "Tax before apportionment"),
    ("limitedIncomeCredit", "No tax status or limited income credit"),
    ("credits", "Total credits"),
    ("dependentCredit", "Child and family credit"),
    ("earnedIncomeCredit", "Massachusetts earned income credit"),
    ("refundableCredits", "Refundable credits"),
];

static REVIEW: &[ReviewSection] = &[
    ReviewSection {
        title: "Income",
        keys: &["additions", "subtractions", "maAgi"],
    },
    ReviewSection {
        title: "Tax",
        keys: &[
            "exemptions",
            "rentalDeduction",
            "taxableIncome",
            "baseTax",
            "surtax",
            "tax",
            "limitedIncomeCredit",
            "netTax",
        ],
    },
    ReviewSection {
        title: "Payments",
        keys: &["withholding", "dependentCredit", "earnedIncomeCredit", "overpaid", "owed"],
    },
];

const RATE: Decimal = dec!(0.05);
const SURTAX_RATE: Decimal = dec!(0.04);
const SURTAX_THRESHOLD: Money = Money::dollars(1_083_150);
const DEPENDENT_EXEMPTION: Money = Money::dollars(1_000);
const AGE_EXEMPTION: Money = Money::dollars(700);
const BLIND_EXEMPTION: Money = Money::dollars(2_200);
const DEPENDENT_CREDIT: Money = Money::dollars(440);
const DEPENDENT_CREDIT_AGE: i32 = 13;
const EARNED_INCOME_CREDIT_SHARE: Decimal = dec!(0.40);

/// Personal exemption by filing status. A surviving spouse files as head
/// of household in Massachusetts.
fn personal_exemption(status: FilingStatusCode) -> Money {
    match status {
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
            Money::dollars(4_400)
        }
        FilingStatusCode::MarriedFilingJointly => Money::dollars(8_800),
        FilingStatusCode::HeadOfHousehold | FilingStatusCode::QualifyingSurvivingSpouse => {
            Money::dollars(6_800)
        }
    }
}

/// Schedule NTS-L-NR/PY income threshold for no tax status, or `None`
/// when the status cannot claim it.
fn no_tax_threshold(
    status: FilingStatusCode,
    dependents: usize,
) -> Option<Money> {
    let per_dependent = Money::from_cents(
        DEPENDENT_EXEMPTION
            .cents()
            .saturating_mul(i64::try_from(dependents).unwrap_or(i64::MAX)),
    );
    match status {
        FilingStatusCode::Single => Some(Money::dollars(8_000)),
        FilingStatusCode::HeadOfHousehold | FilingStatusCode::QualifyingSurvivingSpouse => {
            Some(Money::dollars(14_400) + per_dependent)
        }
        FilingStatusCode::MarriedFilingJointly => Some(Money::dollars(16_400) + per_dependent),
        FilingStatusCode::MarriedFilingSeparately => None,
    }
}

/// Tax forgiven under no tax status or the limited income credit.
///
/// Income at or below the threshold owes nothing; between the threshold
/// and 1.75 times it, tax is capped at 10% of the excess.
pub fn limited_income_credit(
    status: FilingStatusCode,
    dependents: usize,
    income: Money,
    tax: Money,
) -> Money {
    let Some(threshold) = no_tax_threshold(status, dependents) else {
        return Money::ZERO;
    };
    if income <= threshold {
        return tax.max_zero();
    }
    if income >= threshold.mul_rate(dec!(1.75)) {
        return Money::ZERO;
    }
    let capped_tax = (income - threshold).mul_rate(dec!(0.10));
    (tax - capped_tax).max_zero().min(tax.max_zero())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaDetail {
    pub additions: Money,
    pub subtractions: Money,
    pub exemptions: Money,
    pub rental_deduction: Money,
    pub base_tax: Money,
    pub surtax: Money,
    pub full_year_tax: Money,
    pub limited_income_credit: Money,
    pub dependent_credit: Money,
    pub earned_income_credit: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Massachusetts;

impl StateRulesModule for Massachusetts {
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
        let dependents = ctx.tax_return.dependents.len();
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
        let ma_agi = scope.record(
            "maAgi",
            form.line11.amount + additions.amount - subtractions.amount,
            [form.line11.id(), additions.id(), subtractions.id()],
            self.label("maAgi"),
        )?;

        let seniors = i64::try_from(common::filers_65_or_older(ctx)).unwrap_or(0);
        let blind = ctx.tax_return.filers().filter(|(_, p)| p.is_blind).count();
        let blind = i64::try_from(blind).unwrap_or(0);
        let dependent_count = i64::try_from(dependents).unwrap_or(0);
        let exemption_total = personal_exemption(status)
            + Money::from_cents(DEPENDENT_EXEMPTION.cents() * dependent_count)
            + Money::from_cents(AGE_EXEMPTION.cents() * seniors)
            + Money::from_cents(BLIND_EXEMPTION.cents() * blind);
        let exemptions = scope.input("exemptions", exemption_total, self.label("exemptions"))?;

        let rental_cap = if status == FilingStatusCode::MarriedFilingSeparately {
            Money::dollars(2_000)
        } else {
            Money::dollars(4_000)
        };
        let rental = if ctx.config.rented_principal_residence {
            ctx.config.rent_paid.max_zero().mul_rate(dec!(0.5)).min(rental_cap)
        } else {
            Money::ZERO
        };
        let rental_deduction = scope.input(
            "rentalDeduction",
            rental,
            self.label("rentalDeduction"),
        )?;

        let taxable_income = scope.record(
            "taxableIncome",
            (ma_agi.amount - exemptions.amount - rental_deduction.amount).max_zero(),
            [ma_agi.id(), exemptions.id(), rental_deduction.id()],
            self.label("taxableIncome"),
        )?;
        let base_tax = scope.record(
            "baseTax",
            taxable_income.amount.mul_rate(RATE),
            [taxable_income.id()],
            self.label("baseTax"),
        )?;
        let surtax = scope.record(
            "surtax",
            (taxable_income.amount - SURTAX_THRESHOLD).max_zero().mul_rate(SURTAX_RATE),
            [taxable_income.id()],
            self.label("surtax"),
        )?;
        let full_year_tax = scope.sum(
            "fullYearTax",
            [&base_tax, &surtax],
            self.label("fullYearTax"),
        )?;
        let tax = common::apportion(scope, "tax", &full_year_tax, ratio, &self.label("tax"))?;

        let limited = scope.record(
            "limitedIncomeCredit",
            limited_income_credit(status, dependents, ma_agi.amount, tax.amount),
            [ma_agi.id(), tax.id()],
            self.label("limitedIncomeCredit"),
        )?;
        let credits = scope.sum("credits", [&limited], self.label("credits"))?;

        let young_dependents = ctx
            .tax_return
            .dependents
            .iter()
            .filter(|d| d.age_at_year_end(year) < DEPENDENT_CREDIT_AGE)
            .count();
        let young_dependents = i64::try_from(young_dependents).unwrap_or(0);
        let dependent_credit = scope.input(
            "dependentCredit",
            Money::from_cents(DEPENDENT_CREDIT.cents() * young_dependents).mul_rate(ratio),
            self.label("dependentCredit"),
        )?;
        let earned_income_credit = scope.record(
            "earnedIncomeCredit",
            form.line27
                .amount
                .mul_rate(EARNED_INCOME_CREDIT_SHARE)
                .mul_rate(ratio),
            [form.line27.id()],
            self.label("earnedIncomeCredit"),
        )?;
        let refundable_credits = scope.sum(
            "refundableCredits",
            [&dependent_credit, &earned_income_credit],
            self.label("refundableCredits"),
        )?;

        let detail = MaDetail {
            additions: additions.amount,
            subtractions: subtractions.amount,
            exemptions: exemptions.amount,
            rental_deduction: rental_deduction.amount,
            base_tax: base_tax.amount,
            surtax: surtax.amount,
            full_year_tax: full_year_tax.amount,
            limited_income_credit: limited.amount,
            dependent_credit: dependent_credit.amount,
            earned_income_credit: earned_income_credit.amount,
        };
        common::settle(
            ctx,
            scope,
            METADATA.form_name,
            ratio,
            StateTotals {
                state_agi: ma_agi,
                taxable_income,
                tax,
                nonrefundable_credits: credits,
                refundable_credits,
            },
            StateDetail::MA(detail),
            warnings,
        )
    }
}
