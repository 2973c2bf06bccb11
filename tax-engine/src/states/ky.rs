//! Kentucky individual income tax return (Form 740).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::common::Money;
use crate::models::{StateCode, ValidationItem};
use crate::states::common::{self, StateTotals};
use crate::states::{
    ReviewSection, StateComputeResult, StateContext, StateDetail, StateMetadata, StateRulesModule,
};
use crate::trace::{TraceError, TraceScope};

static METADATA: StateMetadata = StateMetadata {
    code: StateCode::KY,
    name: "Kentucky",
    form_name: "740",
    node_prefix: "form740",
    template_files: &["ky/740.pdf", "ky/schedule-m.pdf", "ky/schedule-p.pdf"],
};

const LABELS: &[(&str, &str)] = &[
    ("pensionExclusion", "Pension income exclusion (Schedule P)"),
    ("subtractions", "Subtractions (Schedule M)"),
    ("kyAgi", "Kentucky adjusted gross income"),
    ("standardDeduction", "Standard deduction"),
    ("taxableIncome", "Taxable income"),
    ("fullYearTax", "Tax before apportionment"),
    ("personalTaxCredits", "Personal tax credits"),
    ("familySizeCredit", "Family size tax credit"),
    ("credits", "Total credits"),
    ("refundableCredits", "Refundable credits"),
];

static REVIEW: &[ReviewSection] = &[
    ReviewSection {
        title: "Income",
        keys: &["pensionExclusion", "subtractions", "kyAgi"],
    },
    ReviewSection {
        title: "Tax",
        keys: &[
            "standardDeduction",
            "taxableIncome",
            "tax",
            "personalTaxCredits",
            "familySizeCredit",
            "netTax",
        ],
    },
    ReviewSection {
        title: "Payments",
        keys: &["withholding", "estimatedPayments", "overpaid", "owed"],
    },
];

const RATE: Decimal = dec!(0.04);
const STANDARD_DEDUCTION: Money = Money::dollars(3_270);
const PENSION_EXCLUSION_LIMIT: Money = Money::dollars(31_110);
const PERSONAL_TAX_CREDIT: Money = Money::dollars(40);

/// 100% threshold by family size 1 through 4 (larger families use 4).
const FAMILY_SIZE_THRESHOLDS: [Money; 4] = [
    Money::dollars(15_650),
    Money::dollars(21_150),
    Money::dollars(26_650),
    Money::dollars(32_150),
];

/// `(income as a percent of the threshold, share of tax credited)`, first
/// match wins.
const FAMILY_SIZE_TABLE: [(i64, Decimal); 10] = [
    (100, dec!(1.00)),
    (101, dec!(0.90)),
    (102, dec!(0.80)),
    (103, dec!(0.70)),
    (104, dec!(0.60)),
    (105, dec!(0.50)),
    (106, dec!(0.40)),
    (107, dec!(0.30)),
    (108, dec!(0.20)),
    (133, dec!(0.10)),
];

/// Share of tax forgiven by the family size tax credit.
pub fn family_size_credit_share(
    family_size: usize,
    income: Money,
) -> Decimal {
    let index = family_size.clamp(1, FAMILY_SIZE_THRESHOLDS.len()) - 1;
    let threshold = FAMILY_SIZE_THRESHOLDS[index].cents();
    let income = income.max_zero().cents().saturating_mul(100);
    FAMILY_SIZE_TABLE
        .iter()
        .find(|(percent, _)| income <= threshold.saturating_mul(*percent))
        .map_or(Decimal::ZERO, |(_, share)| *share)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KyDetail {
    pub pension_exclusion: Money,
    pub subtractions: Money,
    pub full_year_tax: Money,
    pub personal_tax_credits: Money,
    pub family_size: usize,
    pub family_size_share: Decimal,
    pub family_size_credit: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Kentucky;

impl StateRulesModule for Kentucky {
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
        let (ratio, notice) = common::apportionment(ctx.config, ctx.tax_year());
        let mut warnings: Vec<_> = notice.into_iter().collect();

        // One exclusion per return, whoever received the pension.
        let retirement = form.line4b.amount + form.line5b.amount;
        let pension_exclusion = scope.record(
            "pensionExclusion",
            retirement.max_zero().min(PENSION_EXCLUSION_LIMIT),
            [form.line4b.id(), form.line5b.id()],
            self.label("pensionExclusion"),
        )?;
        if ctx.filing_status().is_joint() && pension_exclusion.amount.is_positive() {
            warn!("Kentucky pension exclusion applied once for a joint return");
            warnings.push(
                ValidationItem::warning(
                    "ky.pension-exclusion-per-return",
                    "Kentucky pension exclusion is applied once per return, not per spouse; a \
                     joint return where both spouses have pension income may be overstating tax",
                )
                .at(pension_exclusion.id()),
            );
        }
        let us_interest = common::us_obligation_interest(ctx, scope, LABELS)?;
        let subtractions = scope.sum(
            "subtractions",
            [&form.line6b, &us_interest, &pension_exclusion],
            self.label("subtractions"),
        )?;
        let ky_agi = scope.record(
            "kyAgi",
            form.line11.amount - subtractions.amount,
            [form.line11.id(), subtractions.id()],
            self.label("kyAgi"),
        )?;

        let standard = scope.input(
            "standardDeduction",
            STANDARD_DEDUCTION,
            self.label("standardDeduction"),
        )?;
        let taxable_income = scope.record(
            "taxableIncome",
            (ky_agi.amount - standard.amount).max_zero(),
            [ky_agi.id(), standard.id()],
            self.label("taxableIncome"),
        )?;
        let full_year_tax = scope.record(
            "fullYearTax",
            taxable_income.amount.mul_rate(RATE),
            [taxable_income.id()],
            self.label("fullYearTax"),
        )?;
        let tax = common::apportion(scope, "tax", &full_year_tax, ratio, &self.label("tax"))?;

        let boxes = i64::from(ctx.tax_return.age_and_blindness_boxes());
        let personal_tax_credits = scope.record(
            "personalTaxCredits",
            Money::from_cents(PERSONAL_TAX_CREDIT.cents() * boxes).min(tax.amount),
            [tax.id()],
            self.label("personalTaxCredits"),
        )?;

        let family_size = ctx.tax_return.household_size();
        let share = family_size_credit_share(family_size, ky_agi.amount);
        let family_size_credit = scope.record(
            "familySizeCredit",
            (tax.amount - personal_tax_credits.amount).max_zero().mul_rate(share),
            [tax.id(), personal_tax_credits.id(), ky_agi.id()],
            self.label("familySizeCredit"),
        )?;
        let credits = scope.sum(
            "credits",
            [&personal_tax_credits, &family_size_credit],
            self.label("credits"),
        )?;
        let refundable_credits = scope.input(
            "refundableCredits",
            Money::ZERO,
            self.label("refundableCredits"),
        )?;

        let detail = KyDetail {
            pension_exclusion: pension_exclusion.amount,
            subtractions: subtractions.amount,
            full_year_tax: full_year_tax.amount,
            personal_tax_credits: personal_tax_credits.amount,
            family_size,
            family_size_share: share,
            family_size_credit: family_size_credit.amount,
        };
        common::settle(
            ctx,
            scope,
            METADATA.form_name,
            ratio,
            StateTotals {
                state_agi: ky_agi,
                taxable_income,
                tax,
                nonrefundable_credits: credits,
                refundable_credits,
            },
            StateDetail::KY(detail),
            warnings,
        )
    }
}
