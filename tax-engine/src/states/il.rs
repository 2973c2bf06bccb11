//! Illinois individual income tax return (IL-1040).

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
    code: StateCode::IL,
    name: "Illinois",
    form_name: "IL-1040",
    node_prefix: "il1040",
    template_files: &["il/il-1040.pdf", "il/schedule-m.pdf", "il/schedule-icr.pdf"],
};

const LABELS: &[(&str, &str)] = &[
    ("taxExemptInterest", "Federally tax-exempt interest and dividends"),
    ("retirementIncome", "Retirement income"),
    ("subtractions", "Subtractions (Schedule M)"),
    ("baseIncome", "Illinois base income"),
    ("exemptionAllowance", "Exemption allowance"),
    ("taxableIncome", "Net income"),
    ("fullYearTax", "Tax before apportionment"),
    ("propertyTaxCredit", "Property tax credit"),
    ("credits", "Total credits"),
    ("earnedIncomeCredit", "Illinois earned income credit"),
    ("refundableCredits", "Refundable credits"),
];

static REVIEW: &[ReviewSection] = &[
    ReviewSection {
        title: "Base income",
        keys: &["taxExemptInterest", "subtractions", "baseIncome"],
    },
    ReviewSection {
        title: "Tax",
        keys: &["exemptionAllowance", "taxableIncome", "tax", "propertyTaxCredit", "netTax"],
    },
    ReviewSection {
        title: "Payments",
        keys: &["withholding", "earnedIncomeCredit", "overpaid", "owed"],
    },
];

const EXEMPTION: Money = Money::dollars(2_850);
const SENIOR_OR_BLIND_EXEMPTION: Money = Money::dollars(1_000);

/// Federal AGI above which no exemption or property tax credit is allowed.
fn income_limit(status: FilingStatusCode) -> Money {
    if status == FilingStatusCode::MarriedFilingJointly {
        Money::dollars(500_000)
    } else {
        Money::dollars(250_000)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IlDetail {
    pub additions: Money,
    pub subtractions: Money,
    pub exemption_allowance: Money,
    pub full_year_tax: Money,
    pub property_tax_credit: Money,
    pub earned_income_credit: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Illinois;

impl StateRulesModule for Illinois {
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
        let (ratio, notice) = common::apportionment(ctx.config, ctx.tax_year());
        let warnings: Vec<_> = notice.into_iter().collect();

        let additions = scope.record(
            "taxExemptInterest",
            form.line2a.amount,
            [form.line2a.id()],
            self.label("taxExemptInterest"),
        )?;
        let retirement = scope.sum(
            "retirementIncome",
            [&form.line4b, &form.line5b],
            self.label("retirementIncome"),
        )?;
        let us_interest = common::us_obligation_interest(ctx, scope, LABELS)?;
        let subtractions = scope.sum(
            "subtractions",
            [&retirement, &form.line6b, &us_interest],
            self.label("subtractions"),
        )?;
        let base_income = scope.record(
            "baseIncome",
            form.line11.amount + additions.amount - subtractions.amount,
            [form.line11.id(), additions.id(), subtractions.id()],
            self.label("baseIncome"),
        )?;

        let over_limit = form.line11.amount > income_limit(status);
        let people = i64::try_from(ctx.tax_return.household_size()).unwrap_or(i64::MAX);
        let boxes = i64::from(ctx.tax_return.age_and_blindness_boxes());
        let allowance = if over_limit {
            Money::ZERO
        } else {
            Money::from_cents(
                EXEMPTION.cents().saturating_mul(people)
                    + SENIOR_OR_BLIND_EXEMPTION.cents().saturating_mul(boxes),
            )
        };
        let exemption_allowance = scope.record(
            "exemptionAllowance",
            allowance,
            [form.line11.id()],
            self.label("exemptionAllowance"),
        )?;
        let taxable_income = scope.record(
            "taxableIncome",
            (base_income.amount - exemption_allowance.amount).max_zero(),
            [base_income.id(), exemption_allowance.id()],
            self.label("taxableIncome"),
        )?;
        let full_year_tax = scope.record(
            "fullYearTax",
            taxable_income.amount.mul_rate(dec!(0.0495)),
            [taxable_income.id()],
            self.label("fullYearTax"),
        )?;
        let tax = common::apportion(scope, "tax", &full_year_tax, ratio, &self.label("tax"))?;

        // Schedule ICR: 5% of property tax on the principal residence, up to the tax.
        let property_credit = if over_limit {
            Money::ZERO
        } else {
            ctx.config.property_tax_paid.max_zero().mul_rate(dec!(0.05)).min(tax.amount)
        };
        let property_tax_credit = scope.record(
            "propertyTaxCredit",
            property_credit,
            [tax.id(), form.line11.id()],
            self.label("propertyTaxCredit"),
        )?;
        let credits = scope.sum("credits", [&property_tax_credit], self.label("credits"))?;

        let earned_income_credit = scope.record(
            "earnedIncomeCredit",
            form.line27.amount.mul_rate(dec!(0.20)).mul_rate(ratio),
            [form.line27.id()],
            self.label("earnedIncomeCredit"),
        )?;
        let refundable_credits = scope.sum(
            "refundableCredits",
            [&earned_income_credit],
            self.label("refundableCredits"),
        )?;

        let detail = IlDetail {
            additions: additions.amount,
            subtractions: subtractions.amount,
            exemption_allowance: exemption_allowance.amount,
            full_year_tax: full_year_tax.amount,
            property_tax_credit: property_tax_credit.amount,
            earned_income_credit: earned_income_credit.amount,
        };
        common::settle(
            ctx,
            scope,
            METADATA.form_name,
            ratio,
            StateTotals {
                state_agi: base_income,
                taxable_income,
                tax,
                nonrefundable_credits: credits,
                refundable_credits,
            },
            StateDetail::IL(detail),
            warnings,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{RetirementDistribution, StateReturnConfig};
    use crate::states::common::test_support::{run, wage_earner};

    fn detail(result: &StateComputeResult) -> &IlDetail {
        match &result.detail {
            StateDetail::IL(detail) => detail,
            other => panic!("expected IL detail, got {other:?}"),
        }
    }

    #[test]
    fn flat_rate_after_exemption() {
        let tax_return = wage_earner(FilingStatusCode::Single, 50_000, "IL", 2_500);

        let (result, _) = run(&Illinois, &tax_return, &StateReturnConfig::full_year(StateCode::IL));

        assert_eq!(result.taxable_income.amount, Money::dollars(47_150));
        // 4.95% × 47,150
        assert_eq!(result.tax.amount, Money::from_cents(233_393));
        assert_eq!(result.overpaid.amount, Money::from_cents(16_607));
    }

    #[test]
    fn retirement_income_is_subtracted() {
        let mut tax_return = wage_earner(FilingStatusCode::Single, 30_000, "IL", 0);
        tax_return.retirement_distributions = vec![RetirementDistribution {
            id: "r-1".into(),
            payer: "Pension Fund".into(),
            gross_distribution: Money::dollars(20_000),
            taxable_amount: Money::dollars(20_000),
            ..Default::default()
        }];

        let (result, _) = run(&Illinois, &tax_return, &StateReturnConfig::full_year(StateCode::IL));

        assert_eq!(detail(&result).subtractions, Money::dollars(20_000));
        assert_eq!(result.state_agi.amount, Money::dollars(30_000));
    }

    #[test]
    fn no_exemption_over_income_limit() {
        let tax_return = wage_earner(FilingStatusCode::Single, 260_000, "IL", 0);

        let (result, _) = run(&Illinois, &tax_return, &StateReturnConfig::full_year(StateCode::IL));

        assert_eq!(detail(&result).exemption_allowance, Money::ZERO);
    }

    #[test]
    fn property_tax_credit_is_five_percent() {
        let tax_return = wage_earner(FilingStatusCode::Single, 50_000, "IL", 0);
        let config = StateReturnConfig {
            property_tax_paid: Money::dollars(6_000),
            ..StateReturnConfig::full_year(StateCode::IL)
        };

        let (result, _) = run(&Illinois, &tax_return, &config);

        assert_eq!(detail(&result).property_tax_credit, Money::dollars(300));
    }
}
