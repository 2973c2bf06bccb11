//! Additional Medicare tax (Form 8959) and net investment income tax
//! (Form 8960).

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{FilingStatusCode, TaxYearConfig};

fn additional_medicare_threshold(status: FilingStatusCode) -> Money {
    match status {
        FilingStatusCode::MarriedFilingJointly => Money::dollars(250_000),
        FilingStatusCode::MarriedFilingSeparately => Money::dollars(125_000),
        _ => Money::dollars(200_000),
    }
}

fn net_investment_income_threshold(status: FilingStatusCode) -> Money {
    match status {
        FilingStatusCode::MarriedFilingJointly | FilingStatusCode::QualifyingSurvivingSpouse => {
            Money::dollars(250_000)
        }
        FilingStatusCode::MarriedFilingSeparately => Money::dollars(125_000),
        _ => Money::dollars(200_000),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalMedicareResult {
    /// Line 1
    pub medicare_wages: Money,
    /// Line 7
    pub tax_on_wages: Money,
    /// Line 8
    pub self_employment_income: Money,
    /// Line 13
    pub tax_on_self_employment: Money,
    /// Line 18: Schedule 2, line 11.
    pub tax: Money,
    /// Line 24: Form 1040 line 25c.
    pub additional_withholding: Money,
}

/// Returns `None` when there is neither tax nor additional withholding.
pub fn compute_additional_medicare(
    config: &TaxYearConfig,
    status: FilingStatusCode,
    medicare_wages: Money,
    medicare_withheld: Money,
    self_employment_income: Money,
) -> Option<AdditionalMedicareResult> {
    let threshold = additional_medicare_threshold(status);
    let rate = dec!(0.009);

    let tax_on_wages = (medicare_wages - threshold).max_zero().mul_rate(rate);
    let reduced_threshold = (threshold - medicare_wages).max_zero();
    let self_employment_income = self_employment_income.max_zero();
    let tax_on_self_employment = (self_employment_income - reduced_threshold)
        .max_zero()
        .mul_rate(rate);
    let regular_withholding = medicare_wages.mul_rate(config.employee_medicare_rate);
    let additional_withholding = (medicare_withheld - regular_withholding).max_zero();

    let tax = tax_on_wages + tax_on_self_employment;
    if tax.is_zero() && additional_withholding.is_zero() {
        return None;
    }
    Some(AdditionalMedicareResult {
        medicare_wages,
        tax_on_wages,
        self_employment_income,
        tax_on_self_employment,
        tax,
        additional_withholding,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetInvestmentIncomeResult {
    /// Line 8
    pub net_investment_income: Money,
    /// Line 13
    pub magi: Money,
    /// Line 15
    pub excess_magi: Money,
    /// Line 17: Schedule 2, line 12.
    pub tax: Money,
}

/// `net_gain` is Form 1040 line 7 (a loss is already limited there).
pub fn compute_net_investment_income_tax(
    status: FilingStatusCode,
    magi: Money,
    taxable_interest: Money,
    ordinary_dividends: Money,
    net_gain: Money,
) -> Option<NetInvestmentIncomeResult> {
    let net_investment_income = (taxable_interest + ordinary_dividends + net_gain).max_zero();
    let excess_magi = (magi - net_investment_income_threshold(status)).max_zero();
    let tax = net_investment_income.min(excess_magi).mul_rate(dec!(0.038));
    if tax.is_zero() {
        return None;
    }
    Some(NetInvestmentIncomeResult {
        net_investment_income,
        magi,
        excess_magi,
        tax,
    })
}
