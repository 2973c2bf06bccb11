//! California resident income tax return (Form 540).

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::brackets::bracket_tax;
use crate::calculations::common::Money;
use crate::federal::schedule_a::limited_mortgage_interest;
use crate::models::{FilingStatusCode, ItemizedDeductions, StateCode, TaxBracket, ValidationItem};
use crate::states::common::{self, StateTotals};
use crate::states::{
    ReviewSection, StateComputeResult, StateContext, StateDetail, StateMetadata, StateRulesModule,
};
use crate::trace::{Line, NodeId, TraceError, TraceScope};

static METADATA: StateMetadata = StateMetadata {
    code: StateCode::CA,
    name: "California",
    form_name: "540",
    node_prefix: "form540",
    template_files: &["ca/f540.pdf", "ca/f540-schedule-ca.pdf"],
};

const LABELS: &[(&str, &str)] = &[
    ("hsaAddBack", "HSA deduction and employer HSA contributions"),
    ("subtractions", "Subtractions (Schedule CA)"),
    ("additions", "Additions (Schedule CA)"),
    ("caAgi", "California adjusted gross income"),
    ("standardDeduction", "California standard deduction"),
    ("itemizedDeductions", "California itemized deductions"),
    ("deduction", "Larger of standard or itemized deduction"),
    ("taxableIncome", "Taxable income"),
    ("bracketTax", "Tax from the rate schedule"),
    ("mentalHealthTax", "Behavioral health services tax"),
    ("fullYearTax", "Tax before apportionment"),
    ("exemptionCredits", "Personal, senior, blind and dependent exemption credits"),
    ("rentersCredit", "Nonrefundable renter's credit"),
    ("credits", "Total credits"),
    ("refundableCredits", "Refundable credits"),
];

static REVIEW: &[ReviewSection] = &[
    ReviewSection {
        title: "Income",
        keys: &["subtractions", "additions", "caAgi"],
    },
    ReviewSection {
        title: "Deductions",
        keys: &["standardDeduction", "deduction", "taxableIncome"],
    },
    ReviewSection {
        title: "Tax",
        keys: &[
            "bracketTax",
            "mentalHealthTax",
            "tax",
            "exemptionCredits",
            "rentersCredit",
            "netTax",
        ],
    },
    ReviewSection {
        title: "Payments",
        keys: &["withholding", "estimatedPayments", "overpaid", "owed"],
    },
];

const fn bracket(
    min: i64,
    max: Option<i64>,
    rate: rust_decimal::Decimal,
) -> TaxBracket {
    TaxBracket::from_dollars(min, max, rate)
}

const SINGLE: [TaxBracket; 9] = [
    bracket(0, Some(11_079), dec!(0.01)),
    bracket(11_079, Some(26_264), dec!(0.02)),
    bracket(26_264, Some(41_452), dec!(0.04)),
    bracket(41_452, Some(57_542), dec!(0.06)),
    bracket(57_542, Some(72_724), dec!(0.08)),
    bracket(72_724, Some(371_479), dec!(0.093)),
    bracket(371_479, Some(445_771), dec!(0.103)),
    bracket(445_771, Some(742_953), dec!(0.113)),
    bracket(742_953, None, dec!(0.123)),
];

const JOINT: [TaxBracket; 9] = [
    bracket(0, Some(22_158), dec!(0.01)),
    bracket(22_158, Some(52_528), dec!(0.02)),
    bracket(52_528, Some(82_904), dec!(0.04)),
    bracket(82_904, Some(115_084), dec!(0.06)),
    bracket(115_084, Some(145_448), dec!(0.08)),
    bracket(145_448, Some(742_958), dec!(0.093)),
    bracket(742_958, Some(891_542), dec!(0.103)),
    bracket(891_542, Some(1_485_906), dec!(0.113)),
    bracket(1_485_906, None, dec!(0.123)),
];

const HEAD_OF_HOUSEHOLD: [TaxBracket; 9] = [
    bracket(0, Some(22_173), dec!(0.01)),
    bracket(22_173, Some(52_530), dec!(0.02)),
    bracket(52_530, Some(67_716), dec!(0.04)),
    bracket(67_716, Some(83_805), dec!(0.06)),
    bracket(83_805, Some(98_990), dec!(0.08)),
    bracket(98_990, Some(505_208), dec!(0.093)),
    bracket(505_208, Some(606_251), dec!(0.103)),
    bracket(606_251, Some(1_010_417), dec!(0.113)),
    bracket(1_010_417, None, dec!(0.123)),
];

fn brackets(status: FilingStatusCode) -> &'static [TaxBracket] {
    match status {
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => &SINGLE,
        FilingStatusCode::MarriedFilingJointly | FilingStatusCode::QualifyingSurvivingSpouse => {
            &JOINT
        }
        FilingStatusCode::HeadOfHousehold => &HEAD_OF_HOUSEHOLD,
    }
}

const MENTAL_HEALTH_THRESHOLD: Money = Money::dollars(1_000_000);
const MORTGAGE_DEBT_LIMIT: Money = Money::dollars(1_000_000);
const PERSONAL_CREDIT: Money = Money::dollars(153);
const DEPENDENT_CREDIT: Money = Money::dollars(475);
const CREDIT_REDUCTION: Money = Money::dollars(6);

fn standard_deduction(status: FilingStatusCode) -> Money {
    match status {
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
            Money::dollars(5_706)
        }
        _ => Money::dollars(11_412),
    }
}

/// Federal AGI above which itemized deductions and exemption credits
/// are reduced.
fn high_income_threshold(status: FilingStatusCode) -> Money {
    match status {
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
            Money::dollars(252_203)
        }
        FilingStatusCode::HeadOfHousehold => Money::dollars(378_310),
        FilingStatusCode::MarriedFilingJointly | FilingStatusCode::QualifyingSurvivingSpouse => {
            Money::dollars(504_411)
        }
    }
}

fn renters_credit(status: FilingStatusCode) -> (Money, Money) {
    match status {
        FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
            (Money::dollars(60), Money::dollars(53_994))
        }
        _ => (Money::dollars(120), Money::dollars(107_987)),
    }
}

/// Itemized deductions as California allows them: no deduction for state
/// income tax, no SALT cap, a $1M mortgage limit, then the high-income
/// limitation.
pub fn itemized_deductions(
    ctx: &StateContext<'_>,
    ca_agi: Money,
) -> Money {
    let itemized = &ctx.tax_return.itemized;
    let status = ctx.filing_status();
    let floor = ca_agi.max_zero().mul_rate(dec!(0.075));
    let medical = (itemized.medical_expenses.max_zero() - floor).max_zero();
    let taxes = itemized.real_estate_taxes.max_zero() + itemized.personal_property_taxes.max_zero();
    let limit = if status == FilingStatusCode::MarriedFilingSeparately {
        Money::from_cents(MORTGAGE_DEBT_LIMIT.cents() / 2)
    } else {
        MORTGAGE_DEBT_LIMIT
    };
    let mortgage = limited_mortgage_interest(
        itemized.mortgage_interest,
        itemized.mortgage_principal,
        limit,
    );
    let charitable = ctx
        .federal
        .schedules
        .schedule_a
        .as_ref()
        .map_or(Money::ZERO, |a| a.charitable);
    let total = medical + taxes + mortgage + charitable;

    let excess = (ca_agi - high_income_threshold(status)).max_zero();
    let limitation = excess.mul_rate(dec!(0.06)).min(total.mul_rate(dec!(0.80)));
    total - limitation
}

/// Exemption credits after the high-income phase-out.
fn exemption_credits(
    ctx: &StateContext<'_>,
    federal_agi: Money,
) -> Money {
    let status = ctx.filing_status();
    let personal = if status.uses_joint_thresholds() {
        2
    } else {
        1
    };
    let personal = personal + i64::from(ctx.tax_return.age_and_blindness_boxes());
    let dependents = i64::try_from(ctx.tax_return.dependents.len()).unwrap_or(i64::MAX);

    let step = if status == FilingStatusCode::MarriedFilingSeparately {
        Money::dollars(1_250)
    } else {
        Money::dollars(2_500)
    };
    let steps = (federal_agi - high_income_threshold(status)).units_ceil(step);
    let reduction = Money::from_cents(steps.saturating_mul(CREDIT_REDUCTION.cents()));

    let each = |credit: Money, count: i64| {
        Money::from_cents((credit - reduction).max_zero().cents().saturating_mul(count))
    };
    each(PERSONAL_CREDIT, personal) + each(DEPENDENT_CREDIT, dependents)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaDetail {
    pub subtractions: Money,
    pub additions: Money,
    pub hsa_add_back: Money,
    pub standard_deduction: Money,
    pub itemized_deductions: Option<Money>,
    pub deduction: Money,
    pub bracket_tax: Money,
    pub mental_health_tax: Money,
    pub full_year_tax: Money,
    pub exemption_credits: Money,
    pub renters_credit: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct California;

impl California {
    /// Federal HSA deduction plus employer contributions, both of which
    /// California taxes.
    fn hsa_add_back(
        ctx: &StateContext<'_>,
        scope: &mut TraceScope<'_>,
    ) -> Result<Line, TraceError> {
        let schedules = &ctx.federal.schedules;
        let deduction = &schedules.schedule1.line13;
        let mut inputs = vec![deduction.id().clone()];
        let mut total = deduction.amount;
        for hsa in &schedules.hsa {
            let index = ctx
                .tax_return
                .hsa_accounts
                .iter()
                .position(|account| account.id == hsa.result.account_id);
            if let Some(index) = index {
                total += hsa.result.employer_contributions;
                inputs.push(NodeId::document("form8889", index, "line9"));
            }
        }
        scope.record("hsaAddBack", total, &inputs, common::label(LABELS, "hsaAddBack"))
    }
}

impl StateRulesModule for California {
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
        let mut warnings: Vec<_> = notice.into_iter().collect();

        // Schedule CA
        let us_interest = common::us_obligation_interest(ctx, scope, LABELS)?;
        let subtractions = scope.sum(
            "subtractions",
            [&us_interest, &form.line6b],
            self.label("subtractions"),
        )?;
        let hsa_add_back = Self::hsa_add_back(ctx, scope)?;
        let municipal = common::other_state_municipal_interest(ctx, scope, LABELS)?;
        let additions = scope.sum(
            "additions",
            [&hsa_add_back, &municipal],
            self.label("additions"),
        )?;
        let ca_agi = scope.record(
            "caAgi",
            form.line11.amount - subtractions.amount + additions.amount,
            [form.line11.id(), subtractions.id(), additions.id()],
            self.label("caAgi"),
        )?;

        // Deduction
        let standard = scope.input(
            "standardDeduction",
            standard_deduction(status),
            self.label("standardDeduction"),
        )?;
        let itemized = if ctx.tax_return.itemized == ItemizedDeductions::default() {
            None
        } else {
            Some(scope.record(
                "itemizedDeductions",
                itemized_deductions(ctx, ca_agi.amount),
                [ca_agi.id()],
                self.label("itemizedDeductions"),
            )?)
        };
        let deduction = match &itemized {
            Some(itemized) if itemized.amount > standard.amount => scope.record(
                "deduction",
                itemized.amount,
                [itemized.id(), standard.id()],
                self.label("deduction"),
            )?,
            Some(itemized) => scope.record(
                "deduction",
                standard.amount,
                [standard.id(), itemized.id()],
                self.label("deduction"),
            )?,
            None => scope.record(
                "deduction",
                standard.amount,
                [standard.id()],
                self.label("deduction"),
            )?,
        };
        let taxable_income = scope.record(
            "taxableIncome",
            (ca_agi.amount - deduction.amount).max_zero(),
            [ca_agi.id(), deduction.id()],
            self.label("taxableIncome"),
        )?;

        // Tax
        let bracket_tax = scope.record(
            "bracketTax",
            bracket_tax(brackets(status), taxable_income.amount),
            [taxable_income.id()],
            self.label("bracketTax"),
        )?;
        let mental_health_tax = scope.record(
            "mentalHealthTax",
            (taxable_income.amount - MENTAL_HEALTH_THRESHOLD).max_zero().mul_rate(dec!(0.01)),
            [taxable_income.id()],
            self.label("mentalHealthTax"),
        )?;
        let full_year_tax = scope.sum(
            "fullYearTax",
            [&bracket_tax, &mental_health_tax],
            self.label("fullYearTax"),
        )?;
        let tax = common::apportion(scope, "tax", &full_year_tax, ratio, &self.label("tax"))?;

        // Credits
        let exemption_credits = scope.record(
            "exemptionCredits",
            exemption_credits(ctx, form.line11.amount).mul_rate(ratio),
            [form.line11.id()],
            self.label("exemptionCredits"),
        )?;
        let (renter_amount, renter_limit) = renters_credit(status);
        let renter_eligible = ctx.config.rented_principal_residence
            && ca_agi.amount <= renter_limit
            && ratio >= dec!(0.5);
        if ctx.config.rented_principal_residence && !renter_eligible {
            warnings.push(ValidationItem::info(
                "ca.renters-credit-ineligible",
                "California renter's credit not allowed: income over the limit or resident \
                 under half the year",
            ));
        }
        let renters_credit = scope.record(
            "rentersCredit",
            if renter_eligible { renter_amount } else { Money::ZERO },
            [ca_agi.id()],
            self.label("rentersCredit"),
        )?;
        let credits = scope.sum(
            "credits",
            [&exemption_credits, &renters_credit],
            self.label("credits"),
        )?;
        let refundable_credits = scope.input(
            "refundableCredits",
            Money::ZERO,
            self.label("refundableCredits"),
        )?;

        let detail = CaDetail {
            subtractions: subtractions.amount,
            additions: additions.amount,
            hsa_add_back: hsa_add_back.amount,
            standard_deduction: standard.amount,
            itemized_deductions: itemized.as_ref().map(|line| line.amount),
            deduction: deduction.amount,
            bracket_tax: bracket_tax.amount,
            mental_health_tax: mental_health_tax.amount,
            full_year_tax: full_year_tax.amount,
            exemption_credits: exemption_credits.amount,
            renters_credit: renters_credit.amount,
        };
        common::settle(
            ctx,
            scope,
            METADATA.form_name,
            ratio,
            StateTotals {
                state_agi: ca_agi,
                taxable_income,
                tax,
                nonrefundable_credits: credits,
                refundable_credits,
            },
            StateDetail::CA(detail),
            warnings,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{
        Box12Entry, HsaAccount, InterestStatement, Owner, ResidencyType, StateReturnConfig,
    };
    use crate::states::common::test_support::{run, wage_earner};

    fn detail(result: &StateComputeResult) -> &CaDetail {
        match &result.detail {
            StateDetail::CA(detail) => detail,
            other => panic!("expected CA detail, got {other:?}"),
        }
    }

    #[test]
    fn single_wage_earner() {
        let tax_return = wage_earner(FilingStatusCode::Single, 60_000, "CA", 2_000);

        let (result, _) = run(
            &California,
            &tax_return,
            &StateReturnConfig::full_year(StateCode::CA),
        );

        assert_eq!(result.state_agi.amount, Money::dollars(60_000));
        assert_eq!(result.taxable_income.amount, Money::dollars(54_294));
        // 110.79 + 303.70 + 607.52 + 6% × 12,842
        assert_eq!(detail(&result).bracket_tax, Money::from_cents(179_253));
        assert_eq!(result.nonrefundable_credits.amount, Money::dollars(153));
        assert_eq!(result.net_tax.amount, Money::from_cents(163_953));
        assert_eq!(result.overpaid.amount, Money::from_cents(36_047));
        assert_eq!(result.owed.amount, Money::ZERO);
    }

    #[test]
    fn us_interest_is_subtracted_and_hsa_added_back() {
        let mut tax_return = wage_earner(FilingStatusCode::Single, 60_000, "CA", 0);
        tax_return.interest_statements = vec![InterestStatement {
            id: "int-1".into(),
            payer: "Treasury Direct".into(),
            us_obligation_interest: Money::dollars(1_000),
            ..Default::default()
        }];
        tax_return.wage_statements[0].box12 = vec![Box12Entry {
            code: "W".into(),
            amount: Money::dollars(1_000),
        }];
        tax_return.hsa_accounts = vec![HsaAccount {
            id: "hsa-1".into(),
            owner: Owner::Taxpayer,
            personal_contributions: Money::dollars(2_000),
            ..Default::default()
        }];

        let (result, graph) = run(
            &California,
            &tax_return,
            &StateReturnConfig::full_year(StateCode::CA),
        );

        // 59,000 federal AGI − 1,000 U.S. interest + 3,000 HSA add-back
        assert_eq!(detail(&result).hsa_add_back, Money::dollars(3_000));
        assert_eq!(result.state_agi.amount, Money::dollars(61_000));
        let add_back = graph.get(&NodeId::from("form540.hsaAddBack")).unwrap();
        assert!(add_back.inputs.contains(&NodeId::from("form8889.1.line9")));
    }

    #[test]
    fn exemption_credits_phase_out_above_threshold() {
        let tax_return = wage_earner(FilingStatusCode::Single, 300_000, "CA", 0);

        let (result, _) = run(
            &California,
            &tax_return,
            &StateReturnConfig::full_year(StateCode::CA),
        );

        // 47,797 over the threshold is 20 steps of $6
        assert_eq!(detail(&result).exemption_credits, Money::dollars(33));
    }

    #[test]
    fn renters_credit_for_low_income_renter() {
        let tax_return = wage_earner(FilingStatusCode::Single, 40_000, "CA", 0);
        let config = StateReturnConfig {
            rented_principal_residence: true,
            ..StateReturnConfig::full_year(StateCode::CA)
        };

        let (result, _) = run(&California, &tax_return, &config);

        assert_eq!(detail(&result).renters_credit, Money::dollars(60));
    }

    #[test]
    fn part_year_scales_tax() {
        let tax_return = wage_earner(FilingStatusCode::Single, 60_000, "CA", 0);
        let config = StateReturnConfig {
            residency: ResidencyType::PartYear,
            residency_start: chrono::NaiveDate::from_ymd_opt(2025, 7, 1),
            ..StateReturnConfig::full_year(StateCode::CA)
        };

        let (result, _) = run(&California, &tax_return, &config);

        // 1,792.53 × 184/365, to the dollar
        assert_eq!(result.tax.amount, Money::dollars(904));
        assert_eq!(result.source_income.amount, Money::from_cents(3_024_658));
    }

    #[test]
    fn millionaire_pays_behavioral_health_tax() {
        let tax_return = wage_earner(FilingStatusCode::Single, 1_105_706, "CA", 0);

        let (result, _) = run(
            &California,
            &tax_return,
            &StateReturnConfig::full_year(StateCode::CA),
        );

        assert_eq!(detail(&result).mental_health_tax, Money::dollars(1_000));
    }
}
