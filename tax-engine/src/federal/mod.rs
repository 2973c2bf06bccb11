//! Federal aggregator: Form 1040 and its schedules.
//!
//! Lines are computed strictly top to bottom. Each entity module gets only
//! values that are already final when it runs; in particular the IRA and
//! student loan deductions see total income (line 9), never AGI, because
//! AGI includes them. Every line is recorded in the trace as it is
//! computed, so a line can only ever reference earlier lines.

pub mod form1040;
pub mod schedule_a;
pub mod schedule_c;
pub mod schedule_d;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calculations::brackets::bracket_tax;
use crate::calculations::common::Money;
use crate::calculations::worksheets::{
    QualifiedDividendsWorksheet, SeWorksheet, SeWorksheetConfig, SeWorksheetResult,
    SocialSecurityWorksheet, qualified_dividends_tax, taxable_social_security,
};
use crate::entities::{
    AdditionalMedicareResult, ChildTaxCreditInput, ChildTaxCreditResult, EarnedIncomeCreditInput,
    EarnedIncomeCreditResult, EnergyCreditsResult, HsaInput, HsaResult, IraDeductionInput,
    IraDeductionResult, NetInvestmentIncomeResult, PlanCoverage, PremiumTaxCreditInput,
    PremiumTaxCreditResult, QbiResult, RefundableCreditContext, RefundableCredits,
    RefundableCreditsResult, RsuBasisResult, StudentLoanInterestResult,
    compute_additional_medicare, compute_child_tax_credit, compute_earned_income_credit,
    compute_energy_credits, compute_hsa, compute_ira_deduction, compute_net_investment_income_tax,
    compute_premium_tax_credit, compute_qbi, compute_student_loan_interest, correct_rsu_basis,
};
use crate::models::{
    DeductionMethod, HoldingTerm, ItemizedDeductions, Owner, TaxReturn, TaxYearConfig,
};
use crate::trace::{Line, NodeId, TraceBuilder, TraceError};

pub use form1040::{Form1040Result, Schedule1Result, Schedule2Result, Schedule3Result};
pub use schedule_a::{ScheduleAResult, compute_schedule_a};
pub use schedule_c::{ScheduleCResult, compute_schedule_c};
pub use schedule_d::{ScheduleDResult, compute_schedule_d};

const FORM1040: &str = "form1040";
const SCHEDULE1: &str = "schedule1";
const SCHEDULE2: &str = "schedule2";
const SCHEDULE3: &str = "schedule3";
const SCHEDULE_A: &str = "scheduleA";
const SCHEDULE_C: &str = "scheduleC";
const SCHEDULE_D: &str = "scheduleD";
const SCHEDULE_SE: &str = "scheduleSE";
const SCHEDULE_8812: &str = "schedule8812";
const FORM5695: &str = "form5695";
const FORM8889: &str = "form8889";
const FORM8949: &str = "form8949";
const FORM8959: &str = "form8959";
const FORM8960: &str = "form8960";
const FORM8962: &str = "form8962";
const FORM8995: &str = "form8995";
const SS_WORKSHEET: &str = "ssWorksheet";
const QDCG_WORKSHEET: &str = "qdcgWorksheet";
const IRA: &str = "ira";
const STUDENT_LOAN: &str = "studentLoan";
const EIC: &str = "eic";
const DEDUCTION: &str = "deduction";
const ADJUSTMENTS: &str = "adjustments";
const RSU: &str = "rsu";

const EDUCATOR_EXPENSE_LIMIT: Money = Money::dollars(300);

/// A result that belongs to one filer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owned<T> {
    pub owner: Owner,
    pub result: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeductionUsed {
    Standard,
    Itemized,
}

/// Every schedule, worksheet and entity result behind the Form 1040.
///
/// `None` means the rule did not apply to this return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederalSchedules {
    pub schedule1: Schedule1Result,
    pub schedule2: Schedule2Result,
    pub schedule3: Schedule3Result,
    pub schedule_c: Vec<ScheduleCResult>,
    pub self_employment: Vec<Owned<SeWorksheetResult>>,
    pub rsu: Option<RsuBasisResult>,
    pub schedule_d: Option<ScheduleDResult>,
    pub social_security: Option<SocialSecurityWorksheet>,
    pub hsa: Vec<Owned<HsaResult>>,
    pub ira: Vec<Owned<IraDeductionResult>>,
    pub student_loan: Option<StudentLoanInterestResult>,
    pub schedule_a: Option<ScheduleAResult>,
    pub deduction_used: DeductionUsed,
    pub standard_deduction: Money,
    pub qbi: Option<QbiResult>,
    pub qualified_dividends: Option<QualifiedDividendsWorksheet>,
    pub premium_tax_credit: Option<PremiumTaxCreditResult>,
    pub child_tax_credit: Option<ChildTaxCreditResult>,
    pub energy_credits: Option<EnergyCreditsResult>,
    pub additional_medicare: Option<AdditionalMedicareResult>,
    pub net_investment_income: Option<NetInvestmentIncomeResult>,
    pub earned_income_credit: Option<EarnedIncomeCreditResult>,
    pub refundable_credits: RefundableCreditsResult,
}

impl FederalSchedules {
    /// Combined Schedule C net profit.
    pub fn business_profit(&self) -> Money {
        self.schedule_c.iter().map(|c| c.net_profit).sum()
    }

    pub fn self_employment_tax(&self) -> Money {
        self.self_employment
            .iter()
            .map(|se| se.result.self_employment_tax)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederalComputation {
    pub form1040: Form1040Result,
    pub schedules: FederalSchedules,
    /// Forms and schedules that were needed, in the order they ran.
    pub schedules_executed: Vec<String>,
}

#[derive(Debug, Default)]
struct Executed(Vec<String>);

impl Executed {
    fn add(
        &mut self,
        name: &str,
    ) {
        if !self.0.iter().any(|n| n == name) {
            self.0.push(name.to_owned());
        }
    }
}

fn record(
    trace: &mut TraceBuilder,
    source: &str,
    key: &str,
    value: Money,
    inputs: &[&Line],
    label: impl Into<String>,
) -> Result<Line, TraceError> {
    trace.record(source, key, value, inputs.iter().map(|line| &line.trace_id), label)
}

fn sum(
    trace: &mut TraceBuilder,
    source: &str,
    key: &str,
    parts: &[&Line],
    label: impl Into<String>,
) -> Result<Line, TraceError> {
    trace.scope(source).sum(key, parts.iter().copied(), label)
}

fn doc_input(
    trace: &mut TraceBuilder,
    source: &str,
    index: usize,
    field: &str,
    value: Money,
    label: impl Into<String>,
) -> Result<Line, TraceError> {
    trace.input(source, &format!("{}.{field}", index + 1), value, label)
}

fn total(lines: &[&Line]) -> Money {
    lines.iter().map(|line| line.amount).sum()
}

struct WageLines {
    owner: Owner,
    wages: Line,
    withholding: Line,
    ss_wages: Line,
    medicare_wages: Line,
    medicare_withholding: Line,
}

/// Computes the federal return.
///
/// # Errors
///
/// Only trace integrity violations, which indicate a wiring bug.
pub fn compute_federal(
    tax_return: &TaxReturn,
    config: &TaxYearConfig,
    refundable: &RefundableCredits,
    trace: &mut TraceBuilder,
) -> Result<FederalComputation, TraceError> {
    let status = tax_return.filing_status;
    let year = tax_return.tax_year;
    let mut executed = Executed::default();
    executed.add("Form 1040");

    // ─── source documents ───────────────────────────────────────────────

    let mut w2s = Vec::new();
    for (i, w2) in tax_return.wage_statements.iter().enumerate() {
        let employer = w2.employer_name.as_str();
        // Box 4 is referenced by the excess social security credit.
        doc_input(
            trace,
            "w2",
            i,
            "box4",
            w2.social_security_withholding,
            format!("W-2 {employer}: social security tax withheld"),
        )?;
        w2s.push(WageLines {
            owner: w2.owner,
            wages: doc_input(trace, "w2", i, "box1", w2.wages, format!("W-2 {employer}: wages"))?,
            withholding: doc_input(
                trace,
                "w2",
                i,
                "box2",
                w2.federal_withholding,
                format!("W-2 {employer}: federal income tax withheld"),
            )?,
            ss_wages: doc_input(
                trace,
                "w2",
                i,
                "box3",
                w2.social_security_wages,
                format!("W-2 {employer}: social security wages"),
            )?,
            medicare_wages: doc_input(
                trace,
                "w2",
                i,
                "box5",
                w2.medicare_wages,
                format!("W-2 {employer}: Medicare wages"),
            )?,
            medicare_withholding: doc_input(
                trace,
                "w2",
                i,
                "box6",
                w2.medicare_withholding,
                format!("W-2 {employer}: Medicare tax withheld"),
            )?,
        });
    }

    let mut interest = Vec::new();
    let mut exempt_interest = Vec::new();
    let mut other_withholding = Vec::new();
    for (i, int) in tax_return.interest_statements.iter().enumerate() {
        let payer = int.payer.as_str();
        interest.push(
            doc_input(
                trace,
                "1099int",
                i,
                "box1",
                int.interest,
                format!("1099-INT {payer}: interest"),
            )?,
        );
        interest.push(doc_input(
            trace,
            "1099int",
            i,
            "box3",
            int.us_obligation_interest,
            format!("1099-INT {payer}: U.S. savings bond and Treasury interest"),
        )?);
        exempt_interest.push(doc_input(
            trace,
            "1099int",
            i,
            "box8",
            int.tax_exempt_interest,
            format!("1099-INT {payer}: tax-exempt interest"),
        )?);
        other_withholding.push(doc_input(
            trace,
            "1099int",
            i,
            "box4",
            int.federal_withholding,
            format!("1099-INT {payer}: federal income tax withheld"),
        )?);
    }

    let mut ordinary_dividends = Vec::new();
    let mut qualified_dividends = Vec::new();
    let mut distributions = Vec::new();
    for (i, div) in tax_return.dividend_statements.iter().enumerate() {
        let payer = div.payer.as_str();
        ordinary_dividends.push(doc_input(
            trace,
            "1099div",
            i,
            "box1a",
            div.ordinary_dividends,
            format!("1099-DIV {payer}: ordinary dividends"),
        )?);
        qualified_dividends.push(doc_input(
            trace,
            "1099div",
            i,
            "box1b",
            div.qualified_dividends,
            format!("1099-DIV {payer}: qualified dividends"),
        )?);
        distributions.push(doc_input(
            trace,
            "1099div",
            i,
            "box2a",
            div.capital_gain_distributions,
            format!("1099-DIV {payer}: capital gain distributions"),
        )?);
        exempt_interest.push(doc_input(
            trace,
            "1099div",
            i,
            "box12",
            div.exempt_interest_dividends,
            format!("1099-DIV {payer}: exempt-interest dividends"),
        )?);
        other_withholding.push(doc_input(
            trace,
            "1099div",
            i,
            "box4",
            div.federal_withholding,
            format!("1099-DIV {payer}: federal income tax withheld"),
        )?);
    }

    let (mut ira_gross, mut ira_taxable, mut pension_gross, mut pension_taxable) =
        (Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for (i, dist) in tax_return.retirement_distributions.iter().enumerate() {
        let payer = dist.payer.as_str();
        let gross = doc_input(
            trace,
            "1099r",
            i,
            "box1",
            dist.gross_distribution,
            format!("1099-R {payer}: gross distribution"),
        )?;
        let taxable = doc_input(
            trace,
            "1099r",
            i,
            "box2a",
            dist.taxable_amount,
            format!("1099-R {payer}: taxable amount"),
        )?;
        other_withholding.push(doc_input(
            trace,
            "1099r",
            i,
            "box4",
            dist.federal_withholding,
            format!("1099-R {payer}: federal income tax withheld"),
        )?);
        if dist.is_ira {
            ira_gross.push(gross);
            ira_taxable.push(taxable);
        } else {
            pension_gross.push(gross);
            pension_taxable.push(taxable);
        }
    }

    let mut benefits = Vec::new();
    for (i, ssa) in tax_return.social_security_statements.iter().enumerate() {
        benefits.push(
            doc_input(trace, "ssa1099", i, "box5", ssa.net_benefits, "SSA-1099: net benefits")?,
        );
        other_withholding.push(doc_input(
            trace,
            "ssa1099",
            i,
            "box6",
            ssa.federal_withholding,
            "SSA-1099: federal income tax withheld",
        )?);
    }

    // ─── income: lines 1 through 6a ─────────────────────────────────────

    let wage_lines: Vec<&Line> = w2s.iter().map(|w| &w.wages).collect();
    let line1a = sum(trace, FORM1040, "line1a", &wage_lines, "Total amount from W-2 box 1")?;
    let line1z = sum(trace, FORM1040, "line1z", &[&line1a], "Total wages")?;
    let line2a = sum(
        trace,
        FORM1040,
        "line2a",
        &exempt_interest.iter().collect::<Vec<_>>(),
        "Tax-exempt interest",
    )?;
    let line2b = sum(
        trace,
        FORM1040,
        "line2b",
        &interest.iter().collect::<Vec<_>>(),
        "Taxable interest",
    )?;
    let line3a = sum(
        trace,
        FORM1040,
        "line3a",
        &qualified_dividends.iter().collect::<Vec<_>>(),
        "Qualified dividends",
    )?;
    let line3b = sum(
        trace,
        FORM1040,
        "line3b",
        &ordinary_dividends.iter().collect::<Vec<_>>(),
        "Ordinary dividends",
    )?;
    let line4a = sum(
        trace,
        FORM1040,
        "line4a",
        &ira_gross.iter().collect::<Vec<_>>(),
        "IRA distributions",
    )?;
    let line4b = sum(
        trace,
        FORM1040,
        "line4b",
        &ira_taxable.iter().collect::<Vec<_>>(),
        "Taxable IRA distributions",
    )?;
    let line5a = sum(
        trace,
        FORM1040,
        "line5a",
        &pension_gross.iter().collect::<Vec<_>>(),
        "Pensions and annuities",
    )?;
    let line5b = sum(
        trace,
        FORM1040,
        "line5b",
        &pension_taxable.iter().collect::<Vec<_>>(),
        "Taxable pensions and annuities",
    )?;
    let line6a = sum(
        trace,
        FORM1040,
        "line6a",
        &benefits.iter().collect::<Vec<_>>(),
        "Social security benefits",
    )?;

    // ─── Schedule C ─────────────────────────────────────────────────────

    let mut schedule_c = Vec::new();
    let mut profit_lines: Vec<(Owner, Line)> = Vec::new();
    for (i, business) in tax_return.businesses.iter().enumerate() {
        executed.add("Schedule C");
        let result = compute_schedule_c(business, year);
        let n = i + 1;
        let name = business.name.as_str();
        let gross = trace.input(
            SCHEDULE_C,
            &format!("{n}.line7"),
            result.gross_income,
            format!("{name}: gross income"),
        )?;
        let expenses = trace.input(
            SCHEDULE_C,
            &format!("{n}.line28"),
            result.expenses,
            format!("{name}: total expenses"),
        )?;
        let tentative = record(
            trace,
            SCHEDULE_C,
            &format!("{n}.line29"),
            result.tentative_profit,
            &[&gross, &expenses],
            format!("{name}: tentative profit"),
        )?;
        if let Some(office) = &result.home_office {
            executed.add("Form 8829");
            debug!(
                business = name,
                deduction = %office.deduction,
                carryforward = %office.carryforward,
                form8829_carryover = %office.form8829_carryover,
                "home office"
            );
        }
        let home_office = record(
            trace,
            SCHEDULE_C,
            &format!("{n}.line30"),
            result.home_office_deduction(),
            &[&tentative],
            format!("{name}: business use of home"),
        )?;
        let net = record(
            trace,
            SCHEDULE_C,
            &format!("{n}.line31"),
            result.net_profit,
            &[&tentative, &home_office],
            format!("{name}: net profit or (loss)"),
        )?;
        profit_lines.push((business.owner, net));
        schedule_c.push(result);
    }

    // ─── capital gains: RSU correction, Form 8949, Schedule D ──────────

    let sales = &tax_return.brokerage_transactions;
    let rsu = (!sales.is_empty()).then(|| correct_rsu_basis(sales, &tax_return.rsu_vests));
    let distribution_total = total(&distributions.iter().collect::<Vec<_>>());
    let (schedule_d, line7) = match &rsu {
        Some(rsu) => {
            executed.add("Form 8949");
            executed.add("Schedule D");
            if !rsu.matches.is_empty() {
                debug!(
                    matches = rsu.matches.len(),
                    adjustment = %rsu.total_adjustment(),
                    "RSU basis corrected"
                );
            }
            let mut short_lines = Vec::new();
            let mut long_lines = Vec::new();
            for (i, (sale, adjusted)) in sales.iter().zip(&rsu.sales).enumerate() {
                let proceeds = doc_input(
                    trace,
                    "1099b",
                    i,
                    "proceeds",
                    sale.proceeds,
                    format!("1099-B {}: proceeds", sale.description),
                )?;
                let mut basis = doc_input(
                    trace,
                    "1099b",
                    i,
                    "basis",
                    sale.cost_basis,
                    format!("1099-B {}: reported basis", sale.description),
                )?;
                if let Some(vest) = &adjusted.matched_vest {
                    basis = record(
                        trace,
                        RSU,
                        &format!("{}.basis", i + 1),
                        adjusted.basis,
                        &[&basis],
                        format!("Basis corrected to value at vest ({vest})"),
                    )?;
                }
                let wash;
                let mut inputs = vec![&proceeds, &basis];
                if !sale.wash_sale_disallowed.is_zero() {
                    wash = doc_input(
                        trace,
                        "1099b",
                        i,
                        "washSale",
                        sale.wash_sale_disallowed,
                        "Wash sale loss disallowed",
                    )?;
                    inputs.push(&wash);
                }
                let gain = record(
                    trace,
                    FORM8949,
                    &format!("{}.gainLoss", i + 1),
                    adjusted.gain_loss,
                    &inputs,
                    format!("{}: gain or (loss)", sale.description),
                )?;
                match sale.term() {
                    HoldingTerm::Short => short_lines.push(gain),
                    HoldingTerm::Long => long_lines.push(gain),
                }
            }
            let result = compute_schedule_d(
                sales,
                &rsu.sales,
                distribution_total,
                config.capital_loss_limit(status),
            );
            let line7 = sum(
                trace,
                SCHEDULE_D,
                "line7",
                &short_lines.iter().collect::<Vec<_>>(),
                "Net short-term gain or (loss)",
            )?;
            let line13 = sum(
                trace,
                SCHEDULE_D,
                "line13",
                &distributions.iter().collect::<Vec<_>>(),
                "Capital gain distributions",
            )?;
            let mut long_parts: Vec<&Line> = long_lines.iter().collect();
            long_parts.push(&line13);
            let line15 = sum(
                trace,
                SCHEDULE_D,
                "line15",
                &long_parts,
                "Net long-term gain or (loss)",
            )?;
            let line16 = sum(
                trace,
                SCHEDULE_D,
                "line16",
                &[&line7, &line15],
                "Net gain or (loss)",
            )?;
            let line21 = record(
                trace,
                SCHEDULE_D,
                "line21",
                result.allowed_gain_loss,
                &[&line16],
                "Gain, or loss limited to the annual maximum",
            )?;
            let form_line7 = record(
                trace,
                FORM1040,
                "line7",
                result.allowed_gain_loss,
                &[&line21],
                "Capital gain or (loss)",
            )?;
            (Some(result), form_line7)
        }
        None if distribution_total.is_positive() => {
            let dist: Vec<&Line> = distributions.iter().collect();
            let line = sum(trace, FORM1040, "line7", &dist, "Capital gain distributions")?;
            let result = ScheduleDResult {
                capital_gain_distributions: distribution_total,
                long_term_gain: distribution_total,
                net_gain: distribution_total,
                allowed_gain_loss: distribution_total,
                net_capital_gain: distribution_total,
                ..Default::default()
            };
            (Some(result), line)
        }
        None => (None, trace.input(FORM1040, "line7", Money::ZERO, "Capital gain or (loss)")?),
    };
    let net_capital_gain = schedule_d.as_ref().map_or(Money::ZERO, |d| d.net_capital_gain);

    // ─── Form 8889 ──────────────────────────────────────────────────────

    let mut hsa = Vec::new();
    let mut hsa_deductions = Vec::new();
    let mut hsa_taxable = Vec::new();
    let mut hsa_excess_tax = Vec::new();
    let mut hsa_additional_tax = Vec::new();
    let mut w2_hsa_claimed = BTreeSet::new();
    for (i, account) in tax_return.hsa_accounts.iter().enumerate() {
        let Some(person) = tax_return.person(account.owner) else {
            continue;
        };
        // W-2 code W contributions count once per account holder.
        let w2_employer_contributions = if w2_hsa_claimed.insert(account.owner) {
            tax_return
                .wage_statements
                .iter()
                .filter(|w2| w2.owner == account.owner)
                .map(|w2| w2.box12_total("W"))
                .sum()
        } else {
            Money::ZERO
        };
        let input = HsaInput {
            account,
            age_at_year_end: person.age_at_year_end(year),
            is_disabled: person.is_disabled,
            w2_employer_contributions,
        };
        let Some(result) = compute_hsa(&input) else {
            continue;
        };
        executed.add("Form 8889");
        let contributions = doc_input(
            trace,
            FORM8889,
            i,
            "line2",
            result.personal_contributions,
            "HSA contributions you made",
        )?;
        let employer = doc_input(
            trace,
            FORM8889,
            i,
            "line9",
            result.employer_contributions,
            "Employer HSA contributions",
        )?;
        let paid_out = doc_input(
            trace,
            FORM8889,
            i,
            "line14a",
            account.distributions,
            "HSA distributions",
        )?;
        hsa_deductions.push(record(
            trace,
            FORM8889,
            &format!("{}.line13", i + 1),
            result.deduction,
            &[&contributions, &employer],
            "HSA deduction",
        )?);
        let taxable = record(
            trace,
            FORM8889,
            &format!("{}.line16", i + 1),
            result.taxable_distributions,
            &[&paid_out],
            "Taxable HSA distributions",
        )?;
        hsa_additional_tax.push(record(
            trace,
            FORM8889,
            &format!("{}.line17b", i + 1),
            result.additional_tax,
            &[&taxable],
            "Additional 20% tax on HSA distributions",
        )?);
        hsa_taxable.push(taxable);
        hsa_excess_tax.push(record(
            trace,
            FORM8889,
            &format!("{}.excessTax", i + 1),
            result.excess_contribution_tax,
            &[&contributions, &employer],
            "6% tax on excess HSA contributions",
        )?);
        hsa.push(Owned {
            owner: account.owner,
            result,
        });
    }

    // ─── Schedule 1, part I ─────────────────────────────────────────────

    let s1_line3 = sum(
        trace,
        SCHEDULE1,
        "line3",
        &profit_lines.iter().map(|(_, l)| l).collect::<Vec<_>>(),
        "Business income or (loss)",
    )?;
    let s1_line7 = trace.input(
        SCHEDULE1,
        "line7",
        tax_return.other_income.unemployment_compensation,
        "Unemployment compensation",
    )?;
    let s1_line8f = sum(
        trace,
        SCHEDULE1,
        "line8f",
        &hsa_taxable.iter().collect::<Vec<_>>(),
        "Taxable HSA distributions",
    )?;
    let s1_line8z = trace.input(
        SCHEDULE1,
        "line8z",
        tax_return.other_income.other,
        "Other income",
    )?;
    let s1_line9 = sum(trace, SCHEDULE1, "line9", &[&s1_line8f, &s1_line8z], "Total other income")?;
    let s1_line10 = sum(
        trace,
        SCHEDULE1,
        "line10",
        &[&s1_line3, &s1_line7, &s1_line9],
        "Additional income",
    )?;
    let line8 = record(
        trace,
        FORM1040,
        "line8",
        s1_line10.amount,
        &[&s1_line10],
        "Additional income from Schedule 1",
    )?;
    if !s1_line10.amount.is_zero() {
        executed.add("Schedule 1");
    }

    // ─── Schedule SE ────────────────────────────────────────────────────

    let se_worksheet = SeWorksheet::new(SeWorksheetConfig::from_tax_year_config(config));
    let owners: BTreeSet<Owner> = profit_lines.iter().map(|(owner, _)| *owner).collect();
    let mut self_employment = Vec::new();
    let mut se_tax_lines = Vec::new();
    let mut se_deduction_lines = Vec::new();
    for owner in owners {
        let mut inputs: Vec<&Line> = profit_lines
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, l)| l)
            .collect();
        let net_profit = total(&inputs);
        let ss_wage_lines: Vec<&Line> = w2s
            .iter()
            .filter(|w| w.owner == owner)
            .map(|w| &w.ss_wages)
            .collect();
        let result = se_worksheet.calculate(net_profit, total(&ss_wage_lines));
        if result.below_threshold {
            continue;
        }
        executed.add("Schedule SE");
        inputs.extend(ss_wage_lines);
        let tax = record(
            trace,
            SCHEDULE_SE,
            &format!("{}.line12", owner.key()),
            result.self_employment_tax,
            &inputs,
            "Self-employment tax",
        )?;
        se_deduction_lines.push(record(
            trace,
            SCHEDULE_SE,
            &format!("{}.line13", owner.key()),
            result.se_tax_deduction,
            &[&tax],
            "Deduction for one-half of self-employment tax",
        )?);
        se_tax_lines.push(tax);
        self_employment.push(Owned { owner, result });
    }

    // ─── Schedule 1, part II (before the IRA) ──────────────────────────

    let filer_count = i64::try_from(tax_return.filers().count()).unwrap_or(1);
    let educator_paid = trace.input(
        ADJUSTMENTS,
        "educatorExpenses",
        tax_return.adjustments.educator_expenses,
        "Educator expenses paid",
    )?;
    let educator_limit = Money::from_cents(EDUCATOR_EXPENSE_LIMIT.cents() * filer_count);
    let s1_line11 = record(
        trace,
        SCHEDULE1,
        "line11",
        educator_paid.amount.max_zero().min(educator_limit),
        &[&educator_paid],
        "Educator expenses",
    )?;
    let s1_line13 = sum(
        trace,
        SCHEDULE1,
        "line13",
        &hsa_deductions.iter().collect::<Vec<_>>(),
        "HSA deduction",
    )?;
    let s1_line15 = sum(
        trace,
        SCHEDULE1,
        "line15",
        &se_deduction_lines.iter().collect::<Vec<_>>(),
        "Deductible part of self-employment tax",
    )?;

    // ─── taxable social security and total income ──────────────────────

    let (social_security, line6b) = if line6a.amount.is_positive() {
        let other_income =
            total(&[&line1z, &line2b, &line3b, &line4b, &line5b, &line7, &s1_line10]);
        // The IRA deduction is left out of the adjustments: it depends on
        // total income, which depends on this worksheet.
        let adjustments = total(&[&s1_line11, &s1_line13, &s1_line15]);
        let worksheet = taxable_social_security(
            status,
            line6a.amount,
            other_income,
            line2a.amount,
            adjustments,
        );
        let provisional = record(
            trace,
            SS_WORKSHEET,
            "line8",
            worksheet.provisional_income,
            &[
                &line6a, &line1z, &line2a, &line2b, &line3b, &line4b, &line5b, &line7, &s1_line10,
                &s1_line11, &s1_line13, &s1_line15,
            ],
            "Provisional income",
        )?;
        let line6b = record(
            trace,
            FORM1040,
            "line6b",
            worksheet.taxable_benefits,
            &[&line6a, &provisional],
            "Taxable social security benefits",
        )?;
        (Some(worksheet), line6b)
    } else {
        (
            None,
            record(
                trace,
                FORM1040,
                "line6b",
                Money::ZERO,
                &[&line6a],
                "Taxable social security benefits",
            )?,
        )
    };

    let line9 = sum(
        trace,
        FORM1040,
        "line9",
        &[&line1z, &line2b, &line3b, &line4b, &line5b, &line6b, &line7, &line8],
        "Total income",
    )?;
    debug!(total_income = %line9.amount, "total income");

    // ─── IRA deduction (MAGI = total income) ───────────────────────────

    let compensation_of = |owner: Owner| -> Money {
        let wages: Money = tax_return
            .wage_statements
            .iter()
            .filter(|w2| w2.owner == owner)
            .map(|w2| w2.wages)
            .sum();
        let profit: Money = schedule_c
            .iter()
            .filter(|c| c.owner == owner)
            .map(|c| c.net_profit)
            .sum();
        let se_deduction: Money = self_employment
            .iter()
            .filter(|se| se.owner == owner)
            .map(|se| se.result.se_tax_deduction)
            .sum();
        wages + (profit - se_deduction).max_zero()
    };
    let covered = |owner: Owner| {
        tax_return
            .wage_statements
            .iter()
            .any(|w2| w2.owner == owner && w2.retirement_plan)
    };

    let mut ira = Vec::new();
    let mut ira_lines = Vec::new();
    for (owner, person) in tax_return.filers() {
        let contribution: Money = tax_return
            .ira_contributions
            .iter()
            .filter(|c| c.owner == owner)
            .map(|c| c.traditional)
            .sum();
        let other = match owner {
            Owner::Taxpayer => Owner::Spouse,
            Owner::Spouse => Owner::Taxpayer,
        };
        let coverage = if covered(owner) {
            PlanCoverage::Covered
        } else if status.is_married() && covered(other) {
            PlanCoverage::SpouseCovered
        } else {
            PlanCoverage::Neither
        };
        // A joint return can support a spousal IRA with combined compensation.
        let compensation = if status.is_joint() {
            compensation_of(Owner::Taxpayer) + compensation_of(Owner::Spouse)
        } else {
            compensation_of(owner)
        };
        let input = IraDeductionInput {
            filing_status: status,
            contribution,
            age_at_year_end: person.age_at_year_end(year),
            coverage,
            compensation,
            magi: line9.amount,
        };
        let Some(result) = compute_ira_deduction(&input) else {
            continue;
        };
        let contributed = trace.input(
            IRA,
            &format!("{}.contribution", owner.key()),
            contribution,
            "Traditional IRA contributions",
        )?;
        ira_lines.push(record(
            trace,
            IRA,
            &format!("{}.deduction", owner.key()),
            result.deduction,
            &[&contributed, &line9],
            "IRA deduction (phase-out measured on total income)",
        )?);
        ira.push(Owned { owner, result });
    }
    let s1_line20 = sum(
        trace,
        SCHEDULE1,
        "line20",
        &ira_lines.iter().collect::<Vec<_>>(),
        "IRA deduction",
    )?;

    // ─── student loan interest (MAGI excludes the deduction itself) ────

    let interest_paid = trace.input(
        STUDENT_LOAN,
        "interestPaid",
        tax_return.adjustments.student_loan_interest,
        "Student loan interest paid",
    )?;
    let student_loan_magi = line9.amount - total(&[&s1_line11, &s1_line13, &s1_line15, &s1_line20]);
    let student_loan = compute_student_loan_interest(
        status,
        interest_paid.amount,
        student_loan_magi,
    );
    let s1_line21 = record(
        trace,
        SCHEDULE1,
        "line21",
        student_loan.as_ref().map_or(Money::ZERO, |s| s.deduction),
        &[&interest_paid, &line9, &s1_line11, &s1_line13, &s1_line15, &s1_line20],
        "Student loan interest deduction",
    )?;
    let s1_line26 = sum(
        trace,
        SCHEDULE1,
        "line26",
        &[&s1_line11, &s1_line13, &s1_line15, &s1_line20, &s1_line21],
        "Adjustments to income",
    )?;
    if !s1_line26.amount.is_zero() {
        executed.add("Schedule 1");
    }
    let line10 = record(
        trace,
        FORM1040,
        "line10",
        s1_line26.amount,
        &[&s1_line26],
        "Adjustments to income from Schedule 1",
    )?;
    let line11 = record(
        trace,
        FORM1040,
        "line11",
        line9.amount - line10.amount,
        &[&line9, &line10],
        "Adjusted gross income",
    )?;
    debug!(agi = %line11.amount, "adjusted gross income");

    // ─── deduction ──────────────────────────────────────────────────────

    let additional = Money::from_cents(
        config.additional_standard_deduction(status).cents()
            * i64::from(tax_return.age_and_blindness_boxes()),
    );
    let standard_deduction = config.standard_deduction(status) + additional;
    let standard = trace.input(DEDUCTION, "standard", standard_deduction, "Standard deduction")?;

    let method = tax_return.elections.deduction_method;
    let has_itemized = tax_return.itemized != ItemizedDeductions::default();
    let schedule_a = (has_itemized || method == DeductionMethod::Itemized)
        .then(|| compute_schedule_a(&tax_return.itemized, status, line11.amount));
    let schedule_a_line = match &schedule_a {
        Some(a) => {
            let itemized = &tax_return.itemized;
            let medical_paid = trace.input(
                SCHEDULE_A,
                "line1",
                itemized.medical_expenses,
                "Medical and dental expenses",
            )?;
            let line4 = record(
                trace,
                SCHEDULE_A,
                "line4",
                a.medical,
                &[&medical_paid, &line11],
                "Medical expenses over 7.5% of AGI",
            )?;
            let line5d = trace.input(
                SCHEDULE_A,
                "line5d",
                a.taxes_paid,
                "State and local taxes paid",
            )?;
            let line5e = record(
                trace,
                SCHEDULE_A,
                "line5e",
                a.taxes_deducted,
                &[&line5d, &line11],
                "State and local taxes, limited",
            )?;
            let interest_paid = trace.input(
                SCHEDULE_A,
                "line8a",
                itemized.mortgage_interest,
                "Home mortgage interest paid",
            )?;
            let line10 = record(
                trace,
                SCHEDULE_A,
                "line10",
                a.mortgage_interest,
                &[&interest_paid],
                "Deductible mortgage interest",
            )?;
            let given = trace.input(
                SCHEDULE_A,
                "contributions",
                itemized.charitable_cash + itemized.charitable_noncash,
                "Charitable contributions made",
            )?;
            let line14 = record(
                trace,
                SCHEDULE_A,
                "line14",
                a.charitable,
                &[&given, &line11],
                "Gifts to charity, limited",
            )?;
            Some(sum(
                trace,
                SCHEDULE_A,
                "line17",
                &[&line4, &line5e, &line10, &line14],
                "Total itemized deductions",
            )?)
        }
        None => None,
    };
    let deduction_used = match (method, &schedule_a) {
        (DeductionMethod::Standard, _) | (_, None) => DeductionUsed::Standard,
        (DeductionMethod::Itemized, Some(_)) => DeductionUsed::Itemized,
        (DeductionMethod::Auto, Some(a)) if a.total > standard_deduction => DeductionUsed::Itemized,
        (DeductionMethod::Auto, Some(_)) => DeductionUsed::Standard,
    };
    let line12 = match (deduction_used, &schedule_a_line) {
        (DeductionUsed::Itemized, Some(itemized)) => {
            executed.add("Schedule A");
            record(
                trace,
                FORM1040,
                "line12",
                itemized.amount,
                &[itemized, &standard],
                "Itemized deductions",
            )?
        }
        (_, Some(itemized)) => {
            record(
                trace,
                FORM1040,
                "line12",
                standard.amount,
                &[&standard, itemized],
                "Standard deduction",
            )?
        }
        (_, None) => record(
            trace,
            FORM1040,
            "line12",
            standard.amount,
            &[&standard],
            "Standard deduction",
        )?,
    };

    // ─── QBI deduction and taxable income ──────────────────────────────

    let taxable_before_qbi = (line11.amount - line12.amount).max_zero();
    let qbi = compute_qbi(
        status,
        s1_line3.amount - s1_line15.amount,
        taxable_before_qbi,
        line3a.amount + net_capital_gain,
    );
    let line13 = match &qbi {
        Some(q) => {
            executed.add("Form 8995");
            let line15 = record(
                trace,
                FORM8995,
                "line15",
                q.deduction,
                &[&s1_line3, &s1_line15, &line11, &line12, &line3a, &line7],
                "Qualified business income deduction",
            )?;
            record(
                trace,
                FORM1040,
                "line13",
                q.deduction,
                &[&line15],
                "Qualified business income deduction",
            )?
        }
        None => trace.input(
            FORM1040,
            "line13",
            Money::ZERO,
            "Qualified business income deduction",
        )?,
    };
    let line14 = sum(trace, FORM1040, "line14", &[&line12, &line13], "Total deductions")?;
    let line15 = record(
        trace,
        FORM1040,
        "line15",
        (line11.amount - line14.amount).max_zero(),
        &[&line11, &line14],
        "Taxable income",
    )?;

    // ─── tax ────────────────────────────────────────────────────────────

    let preferential = line3a.amount.is_positive() || net_capital_gain.is_positive();
    let qualified_dividends_worksheet = preferential.then(|| {
        qualified_dividends_tax(config, status, line15.amount, line3a.amount, net_capital_gain)
    });
    let line16 = match &qualified_dividends_worksheet {
        Some(worksheet) => {
            let worksheet_tax = record(
                trace,
                QDCG_WORKSHEET,
                "line25",
                worksheet.tax,
                &[&line15, &line3a, &line7],
                "Tax from the Qualified Dividends and Capital Gain Tax Worksheet",
            )?;
            record(trace, FORM1040, "line16", worksheet.tax, &[&worksheet_tax], "Tax")?
        }
        None => record(
            trace,
            FORM1040,
            "line16",
            bracket_tax(config.brackets(status), line15.amount),
            &[&line15],
            "Tax from the rate schedule",
        )?,
    };

    // ─── Form 8962 and Schedule 2 part I ───────────────────────────────

    let premium_tax_credit = if tax_return.marketplace_statements.is_empty() {
        None
    } else {
        let input = PremiumTaxCreditInput {
            statements: &tax_return.marketplace_statements,
            filing_status: status,
            household_size: tax_return.household_size(),
            household_income: line11.amount + line2a.amount + (line6a.amount - line6b.amount),
        };
        compute_premium_tax_credit(&input)
    };
    let s2_line2 = match &premium_tax_credit {
        Some(ptc) => {
            executed.add("Form 8962");
            let mut premium_inputs = vec![&line11, &line2a, &line6a, &line6b];
            let mut advance_inputs = Vec::new();
            let mut statement_lines = Vec::new();
            for (i, statement) in tax_return.marketplace_statements.iter().enumerate() {
                let premiums: Money = statement.months.iter().map(|m| m.enrollment_premium).sum();
                let benchmark: Money = statement.months.iter().map(|m| m.benchmark_premium).sum();
                let advance: Money = statement.months.iter().map(|m| m.advance_credit).sum();
                statement_lines.push((
                    doc_input(
                        trace,
                        "1095a",
                        i,
                        "enrollmentPremium",
                        premiums,
                        "1095-A: enrollment premiums",
                    )?,
                    doc_input(
                        trace,
                        "1095a",
                        i,
                        "benchmarkPremium",
                        benchmark,
                        "1095-A: benchmark plan premiums",
                    )?,
                    doc_input(
                        trace,
                        "1095a",
                        i,
                        "advanceCredit",
                        advance,
                        "1095-A: advance payments",
                    )?,
                ));
            }
            for (premium, benchmark, advance) in &statement_lines {
                premium_inputs.push(premium);
                premium_inputs.push(benchmark);
                advance_inputs.push(advance);
            }
            let line24 = record(
                trace,
                FORM8962,
                "line24",
                ptc.total_credit,
                &premium_inputs,
                "Total premium tax credit",
            )?;
            let line25 = sum(
                trace,
                FORM8962,
                "line25",
                &advance_inputs,
                "Advance payment of premium tax credit",
            )?;
            record(
                trace,
                FORM8962,
                "line26",
                ptc.net_credit,
                &[&line24, &line25],
                "Net premium tax credit",
            )?;
            let line29 = record(
                trace,
                FORM8962,
                "line29",
                ptc.repayment,
                &[&line24, &line25],
                "Excess advance credit repayment",
            )?;
            record(
                trace,
                SCHEDULE2,
                "line2",
                ptc.repayment,
                &[&line29],
                "Excess advance premium tax credit repayment",
            )?
        }
        None => trace.input(
            SCHEDULE2,
            "line2",
            Money::ZERO,
            "Excess advance premium tax credit repayment",
        )?,
    };
    let s2_line3 = sum(trace, SCHEDULE2, "line3", &[&s2_line2], "Additions to tax")?;
    let line17 = record(
        trace,
        FORM1040,
        "line17",
        s2_line3.amount,
        &[&s2_line3],
        "Amount from Schedule 2, line 3",
    )?;
    let line18 = sum(trace, FORM1040, "line18", &[&line16, &line17], "Tax before credits")?;

    // ─── Schedule 8812 ──────────────────────────────────────────────────

    let qualifying_children = tax_return
        .dependents
        .iter()
        .filter(|d| d.is_child_tax_credit_child(year))
        .count();
    let other_dependents = tax_return.dependents.len() - qualifying_children;
    let earned_income = (line1z.amount + s1_line3.amount - s1_line15.amount).max_zero();
    let child_tax_credit = compute_child_tax_credit(&ChildTaxCreditInput {
        filing_status: status,
        qualifying_children: u32::try_from(qualifying_children).unwrap_or(u32::MAX),
        other_dependents: u32::try_from(other_dependents).unwrap_or(u32::MAX),
        magi: line11.amount,
        tax_liability: line18.amount,
        earned_income,
    });
    let (line19, actc) = match &child_tax_credit {
        Some(ctc) => {
            executed.add("Schedule 8812");
            let line14 = record(
                trace,
                SCHEDULE_8812,
                "line14",
                ctc.nonrefundable_credit,
                &[&line11, &line18],
                "Child tax credit and credit for other dependents",
            )?;
            let line27 = record(
                trace,
                SCHEDULE_8812,
                "line27",
                ctc.additional_child_tax_credit,
                &[&line14, &line1z, &s1_line3, &s1_line15],
                "Additional child tax credit",
            )?;
            let line19 = record(
                trace,
                FORM1040,
                "line19",
                ctc.nonrefundable_credit,
                &[&line14],
                "Child tax credit",
            )?;
            (line19, Some(line27))
        }
        None => (trace.input(FORM1040, "line19", Money::ZERO, "Child tax credit")?, None),
    };

    // ─── Form 5695 and Schedule 3 part I ───────────────────────────────

    let energy_credits = compute_energy_credits(
        &tax_return.energy_improvements,
        line18.amount - line19.amount,
    );
    let (s3_line5a, s3_line5b) = match &energy_credits {
        Some(energy) => {
            executed.add("Form 5695");
            let costs = trace.input(
                FORM5695,
                "costs",
                tax_return.energy_improvements.iter().map(|e| e.cost).sum(),
                "Qualified energy improvement costs",
            )?;
            let part2 = record(
                trace,
                FORM5695,
                "line32",
                energy.home_improvement_credit,
                &[&costs, &line18, &line19],
                "Energy efficient home improvement credit",
            )?;
            let part1 = record(
                trace,
                FORM5695,
                "line15",
                energy.clean_energy_credit,
                &[&costs, &line18, &line19, &part2],
                "Residential clean energy credit",
            )?;
            (
                record(
                    trace,
                    SCHEDULE3,
                    "line5a",
                    part1.amount,
                    &[&part1],
                    "Residential clean energy credit",
                )?,
                record(
                    trace,
                    SCHEDULE3,
                    "line5b",
                    part2.amount,
                    &[&part2],
                    "Energy efficient home improvement credit",
                )?,
            )
        }
        None => (
            trace.input(SCHEDULE3, "line5a", Money::ZERO, "Residential clean energy credit")?,
            trace.input(
                SCHEDULE3,
                "line5b",
                Money::ZERO,
                "Energy efficient home improvement credit",
            )?,
        ),
    };
    let s3_line8 = sum(
        trace,
        SCHEDULE3,
        "line8",
        &[&s3_line5a, &s3_line5b],
        "Nonrefundable credits",
    )?;
    let line20 = record(
        trace,
        FORM1040,
        "line20",
        s3_line8.amount,
        &[&s3_line8],
        "Amount from Schedule 3, line 8",
    )?;
    let line21 = sum(trace, FORM1040, "line21", &[&line19, &line20], "Total credits")?;
    let line22 = record(
        trace,
        FORM1040,
        "line22",
        (line18.amount - line21.amount).max_zero(),
        &[&line18, &line21],
        "Tax after credits",
    )?;

    // ─── other taxes ────────────────────────────────────────────────────

    let medicare_wage_lines: Vec<&Line> = w2s.iter().map(|w| &w.medicare_wages).collect();
    let medicare_withheld_lines: Vec<&Line> = w2s.iter().map(|w| &w.medicare_withholding).collect();
    let se_earnings: Money = self_employment.iter().map(|se| se.result.net_earnings).sum();
    let additional_medicare = compute_additional_medicare(
        config,
        status,
        total(&medicare_wage_lines),
        total(&medicare_withheld_lines),
        se_earnings,
    );
    let (s2_line11, line25c) = match &additional_medicare {
        Some(medicare) => {
            executed.add("Form 8959");
            let mut inputs = medicare_wage_lines.clone();
            inputs.extend(se_tax_lines.iter());
            let line18 = record(
                trace,
                FORM8959,
                "line18",
                medicare.tax,
                &inputs,
                "Additional Medicare tax",
            )?;
            let mut withheld_inputs = medicare_wage_lines.clone();
            withheld_inputs.extend(medicare_withheld_lines.iter().copied());
            let line24 = record(
                trace,
                FORM8959,
                "line24",
                medicare.additional_withholding,
                &withheld_inputs,
                "Additional Medicare tax withheld",
            )?;
            (
                record(
                    trace,
                    SCHEDULE2,
                    "line11",
                    medicare.tax,
                    &[&line18],
                    "Additional Medicare tax",
                )?,
                record(
                    trace,
                    FORM1040,
                    "line25c",
                    medicare.additional_withholding,
                    &[&line24],
                    "Other federal withholding",
                )?,
            )
        }
        None => (
            trace.input(SCHEDULE2, "line11", Money::ZERO, "Additional Medicare tax")?,
            trace.input(FORM1040, "line25c", Money::ZERO, "Other federal withholding")?,
        ),
    };

    let net_investment_income = compute_net_investment_income_tax(
        status,
        line11.amount,
        line2b.amount,
        line3b.amount,
        line7.amount,
    );
    let s2_line12 = match &net_investment_income {
        Some(niit) => {
            executed.add("Form 8960");
            let line17 = record(
                trace,
                FORM8960,
                "line17",
                niit.tax,
                &[&line2b, &line3b, &line7, &line11],
                "Net investment income tax",
            )?;
            record(trace, SCHEDULE2, "line12", niit.tax, &[&line17], "Net investment income tax")?
        }
        None => trace.input(SCHEDULE2, "line12", Money::ZERO, "Net investment income tax")?,
    };

    let s2_line4 = sum(
        trace,
        SCHEDULE2,
        "line4",
        &se_tax_lines.iter().collect::<Vec<_>>(),
        "Self-employment tax",
    )?;
    let s2_line8 = sum(
        trace,
        SCHEDULE2,
        "line8",
        &hsa_excess_tax.iter().collect::<Vec<_>>(),
        "Additional tax on excess HSA contributions",
    )?;
    let s2_line17c = sum(
        trace,
        SCHEDULE2,
        "line17c",
        &hsa_additional_tax.iter().collect::<Vec<_>>(),
        "Additional tax on HSA distributions",
    )?;
    let s2_line21 = sum(
        trace,
        SCHEDULE2,
        "line21",
        &[&s2_line4, &s2_line8, &s2_line11, &s2_line12, &s2_line17c],
        "Total other taxes",
    )?;
    if !(s2_line3.amount.is_zero() && s2_line21.amount.is_zero()) {
        executed.add("Schedule 2");
    }
    let line23 = record(
        trace,
        FORM1040,
        "line23",
        s2_line21.amount,
        &[&s2_line21],
        "Other taxes from Schedule 2",
    )?;
    let line24 = sum(trace, FORM1040, "line24", &[&line22, &line23], "Total tax")?;

    // ─── payments ───────────────────────────────────────────────────────

    let line25a = sum(
        trace,
        FORM1040,
        "line25a",
        &w2s.iter().map(|w| &w.withholding).collect::<Vec<_>>(),
        "Federal income tax withheld from W-2s",
    )?;
    let line25b = sum(
        trace,
        FORM1040,
        "line25b",
        &other_withholding.iter().collect::<Vec<_>>(),
        "Federal income tax withheld from 1099s",
    )?;
    let line25d = sum(
        trace,
        FORM1040,
        "line25d",
        &[&line25a, &line25b, &line25c],
        "Total federal withholding",
    )?;
    let line26 = trace.input(
        FORM1040,
        "line26",
        tax_return.estimated_payments,
        "Estimated tax payments",
    )?;

    let earned_income_children = tax_return
        .dependents
        .iter()
        .filter(|d| d.is_earned_income_child(year))
        .count();
    let earned_income_credit = compute_earned_income_credit(&EarnedIncomeCreditInput {
        filing_status: status,
        qualifying_children: u32::try_from(earned_income_children).unwrap_or(u32::MAX),
        earned_income,
        agi: line11.amount,
        investment_income: line2a.amount + line2b.amount + line3b.amount + line7.amount.max_zero(),
        filer_ages: tax_return
            .filers()
            .map(|(_, person)| person.age_at_year_end(year))
            .collect(),
    });
    let line27 = match &earned_income_credit {
        Some(eic) => {
            executed.add("Schedule EIC");
            let earned = record(
                trace,
                EIC,
                "earnedIncome",
                earned_income,
                &[&line1z, &s1_line3, &s1_line15],
                "Earned income",
            )?;
            record(
                trace,
                FORM1040,
                "line27",
                eic.credit,
                &[&earned, &line11, &line2a, &line2b, &line3b, &line7],
                "Earned income credit",
            )?
        }
        None => trace.input(FORM1040, "line27", Money::ZERO, "Earned income credit")?,
    };
    let line28 = match &actc {
        Some(line27) => record(
            trace,
            FORM1040,
            "line28",
            line27.amount,
            &[line27],
            "Additional child tax credit",
        )?,
        None => trace.input(FORM1040, "line28", Money::ZERO, "Additional child tax credit")?,
    };

    let refundable_credits = refundable.aggregate(&RefundableCreditContext {
        tax_return,
        config,
        premium_tax_credit: premium_tax_credit.as_ref(),
    });
    let mut refundable_lines = Vec::new();
    for item in &refundable_credits.items {
        refundable_lines.push(
            trace.record(SCHEDULE3, &item.id, item.amount, &item.inputs, item.label.clone())?,
        );
    }
    let s3_line15 = sum(
        trace,
        SCHEDULE3,
        "line15",
        &refundable_lines.iter().collect::<Vec<_>>(),
        "Other payments and refundable credits",
    )?;
    if !(s3_line8.amount.is_zero() && s3_line15.amount.is_zero()) {
        executed.add("Schedule 3");
    }
    let line31 = record(
        trace,
        FORM1040,
        "line31",
        s3_line15.amount,
        &[&s3_line15],
        "Amount from Schedule 3, line 15",
    )?;
    let line32 = sum(
        trace,
        FORM1040,
        "line32",
        &[&line27, &line28, &line31],
        "Other payments and refundable credits",
    )?;
    let line33 = sum(trace, FORM1040, "line33", &[&line25d, &line26, &line32], "Total payments")?;

    // ─── refund or amount owed ──────────────────────────────────────────

    let line34 = record(
        trace,
        FORM1040,
        "line34",
        (line33.amount - line24.amount).max_zero(),
        &[&line33, &line24],
        "Amount overpaid",
    )?;
    let line35a = record(trace, FORM1040, "line35a", line34.amount, &[&line34], "Amount refunded")?;
    let line37 = record(
        trace,
        FORM1040,
        "line37",
        (line24.amount - line33.amount).max_zero(),
        &[&line24, &line33],
        "Amount you owe",
    )?;

    info!(
        agi = %line11.amount,
        taxable_income = %line15.amount,
        total_tax = %line24.amount,
        payments = %line33.amount,
        refund = %line35a.amount,
        owed = %line37.amount,
        "federal return computed"
    );

    let schedules = FederalSchedules {
        schedule1: Schedule1Result {
            line3: s1_line3,
            line7: s1_line7,
            line8f: s1_line8f,
            line8z: s1_line8z,
            line9: s1_line9,
            line10: s1_line10,
            line11: s1_line11,
            line13: s1_line13,
            line15: s1_line15,
            line20: s1_line20,
            line21: s1_line21,
            line26: s1_line26,
        },
        schedule2: Schedule2Result {
            line2: s2_line2,
            line3: s2_line3,
            line4: s2_line4,
            line8: s2_line8,
            line11: s2_line11,
            line12: s2_line12,
            line17c: s2_line17c,
            line21: s2_line21,
        },
        schedule3: Schedule3Result {
            line5a: s3_line5a,
            line5b: s3_line5b,
            line8: s3_line8,
            refundable: refundable_lines,
            line15: s3_line15,
        },
        schedule_c,
        self_employment,
        rsu,
        schedule_d,
        social_security,
        hsa,
        ira,
        student_loan,
        schedule_a,
        deduction_used,
        standard_deduction,
        qbi,
        qualified_dividends: qualified_dividends_worksheet,
        premium_tax_credit,
        child_tax_credit,
        energy_credits,
        additional_medicare,
        net_investment_income,
        earned_income_credit,
        refundable_credits,
    };

    let form1040 = Form1040Result {
        tax_year: year,
        filing_status: status,
        line1a,
        line1z,
        line2a,
        line2b,
        line3a,
        line3b,
        line4a,
        line4b,
        line5a,
        line5b,
        line6a,
        line6b,
        line7,
        line8,
        line9,
        line10,
        line11,
        line12,
        line13,
        line14,
        line15,
        line16,
        line17,
        line18,
        line19,
        line20,
        line21,
        line22,
        line23,
        line24,
        line25a,
        line25b,
        line25c,
        line25d,
        line26,
        line27,
        line28,
        line31,
        line32,
        line33,
        line34,
        line35a,
        line37,
    };

    Ok(FederalComputation {
        form1040,
        schedules,
        schedules_executed: executed.0,
    })
}

/// Id of a Form 1040 line node, e.g. `form1040.line11`.
pub fn form1040_node(line: &str) -> NodeId {
    NodeId::new(FORM1040, &format!("line{line}"))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{
        Business, Dependent, FilingStatusCode, IraContribution, Person, WageStatement,
    };

    fn person(year: i32) -> Person {
        Person {
            first_name: "Alex".into(),
            date_of_birth: NaiveDate::from_ymd_opt(year, 6, 15).unwrap(),
            ..Default::default()
        }
    }

    fn single_with_wages(wages: i64, withheld: i64) -> TaxReturn {
        TaxReturn {
            tax_year: 2025,
            filing_status: FilingStatusCode::Single,
            taxpayer: person(1985),
            wage_statements: vec![WageStatement {
                id: "w2-1".into(),
                employer_name: "Acme".into(),
                wages: Money::dollars(wages),
                federal_withholding: Money::dollars(withheld),
                social_security_wages: Money::dollars(wages),
                medicare_wages: Money::dollars(wages),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn compute(tax_return: &TaxReturn) -> (FederalComputation, crate::trace::TraceGraph) {
        let mut trace = TraceBuilder::new();
        let result = compute_federal(
            tax_return,
            &TaxYearConfig::TY2025,
            &RefundableCredits::builtin(),
            &mut trace,
        )
        .unwrap();
        (result, trace.finish())
    }

    // ─── wages only ─────────────────────────────────────────────────────

    #[test]
    fn wages_only_single() {
        let (result, _) = compute(&single_with_wages(60_000, 6_000));
        let form = &result.form1040;

        assert_eq!(form.line11.amount, Money::dollars(60_000));
        assert_eq!(form.line12.amount, Money::dollars(15_750));
        assert_eq!(form.line15.amount, Money::dollars(44_250));
        // 1,192.50 + 12% × 32,325
        assert_eq!(form.line16.amount, Money::dollars(5_071) + Money::from_cents(50));
        assert_eq!(form.line34.amount, Money::from_cents(92_850));
        assert_eq!(form.line37.amount, Money::ZERO);
        assert_eq!(result.schedules.deduction_used, DeductionUsed::Standard);
    }

    #[test]
    fn underwithheld_return_owes() {
        let (result, _) = compute(&single_with_wages(60_000, 1_000));

        assert_eq!(result.form1040.line34.amount, Money::ZERO);
        assert_eq!(result.form1040.line37.amount, Money::from_cents(407_150));
    }

    #[test]
    fn every_line_is_traced() {
        let (result, graph) = compute(&single_with_wages(60_000, 6_000));

        for (name, line) in result.form1040.lines() {
            let node = graph.get(line.id()).unwrap_or_else(|| panic!("line {name} not traced"));
            assert_eq!(node.value, line.amount, "line {name}");
        }
        assert!(graph.upstream(result.form1040.line11.id()).contains(&NodeId::from("w2.1.box1")));
    }

    // ─── IRA deduction ──────────────────────────────────────────────────

    #[test]
    fn ira_phase_out_uses_total_income() {
        let mut tax_return = single_with_wages(84_000, 10_000);
        tax_return.wage_statements[0].retirement_plan = true;
        tax_return.ira_contributions = vec![IraContribution {
            id: "ira-1".into(),
            owner: Owner::Taxpayer,
            traditional: Money::dollars(7_000),
        }];

        let (result, graph) = compute(&tax_return);

        assert_eq!(result.form1040.line9.amount, Money::dollars(84_000));
        assert_eq!(result.schedules.schedule1.line20.amount, Money::dollars(3_500));
        assert_eq!(result.form1040.line11.amount, Money::dollars(80_500));
        let deduction = graph.get(&NodeId::from("ira.taxpayer.deduction")).unwrap();
        assert!(deduction.inputs.contains(&NodeId::from("form1040.line9")));
        assert!(
            !graph
                .upstream(&NodeId::from("ira.taxpayer.deduction"))
                .contains(&NodeId::from("form1040.line11"))
        );
    }

    // ─── self-employment ────────────────────────────────────────────────

    #[test]
    fn business_profit_flows_through_schedule_se() {
        let tax_return = TaxReturn {
            tax_year: 2025,
            taxpayer: person(1980),
            businesses: vec![Business {
                id: "biz".into(),
                name: "Consulting".into(),
                gross_receipts: Money::dollars(100_000),
                ..Default::default()
            }],
            ..Default::default()
        };

        let (result, _) = compute(&tax_return);

        assert_eq!(result.schedules.schedule1.line3.amount, Money::dollars(100_000));
        assert_eq!(result.schedules.schedule2.line4.amount, Money::from_cents(1_412_955));
        assert_eq!(result.schedules.schedule1.line15.amount, Money::from_cents(706_478));
        assert!(result.schedules.qbi.is_some());
        assert!(result.schedules_executed.contains(&"Schedule SE".to_owned()));
    }

    // ─── credits ────────────────────────────────────────────────────────

    #[test]
    fn child_tax_credit_reduces_tax() {
        let mut tax_return = single_with_wages(60_000, 6_000);
        tax_return.filing_status = FilingStatusCode::HeadOfHousehold;
        tax_return.dependents = vec![Dependent {
            first_name: "Sam".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(),
            months_lived_with_filer: 12,
            ..Default::default()
        }];

        let (result, _) = compute(&tax_return);

        assert_eq!(result.form1040.line19.amount, Money::dollars(2_200));
        assert_eq!(
            result.form1040.line22.amount,
            result.form1040.line18.amount - Money::dollars(2_200)
        );
    }

    #[test]
    fn refund_and_owed_are_exclusive() {
        for withheld in [0, 4_000, 5_071, 9_000] {
            let (result, _) = compute(&single_with_wages(60_000, withheld));
            let form = &result.form1040;
            assert!(form.line34.amount.is_zero() || form.line37.amount.is_zero());
        }
    }
}
