use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::calculations::common::Money;
use crate::models::{FilingStatusCode, TaxBracket};

/// Federal parameters that more than one rule module needs for a tax year.
///
/// Module-specific limits (IRA, HSA, credits) live next to the module that
/// applies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,

    /// Social security wage base.
    pub ss_wage_max: Money,
    /// Combined (employer + employee) social security rate for self-employment.
    pub ss_tax_rate: Decimal,
    /// Combined Medicare rate for self-employment.
    pub medicare_tax_rate: Decimal,
    /// Employee share of social security withheld on wages.
    pub employee_ss_rate: Decimal,
    /// Employee share of Medicare withheld on wages.
    pub employee_medicare_rate: Decimal,
    /// Share of self-employment profit treated as net earnings (Schedule SE line 4a).
    pub se_net_earnings_factor: Decimal,
    /// Deductible share of self-employment tax.
    pub se_deduction_factor: Decimal,
    /// Net earnings at or below this owe no self-employment tax.
    pub min_se_threshold: Money,

    #[serde(skip)]
    single_brackets: &'static [TaxBracket],
    #[serde(skip)]
    joint_brackets: &'static [TaxBracket],
    #[serde(skip)]
    separate_brackets: &'static [TaxBracket],
    #[serde(skip)]
    head_of_household_brackets: &'static [TaxBracket],
}

const fn bracket(
    min: i64,
    max: Option<i64>,
    rate: Decimal,
) -> TaxBracket {
    TaxBracket::from_dollars(min, max, rate)
}

// Schedule X
const SINGLE_2025: [TaxBracket; 7] = [
    bracket(0, Some(11_925), dec!(0.10)),
    bracket(11_925, Some(48_475), dec!(0.12)),
    bracket(48_475, Some(103_350), dec!(0.22)),
    bracket(103_350, Some(197_300), dec!(0.24)),
    bracket(197_300, Some(250_525), dec!(0.32)),
    bracket(250_525, Some(626_350), dec!(0.35)),
    bracket(626_350, None, dec!(0.37)),
];

// Schedule Y-1
const JOINT_2025: [TaxBracket; 7] = [
    bracket(0, Some(23_850), dec!(0.10)),
    bracket(23_850, Some(96_950), dec!(0.12)),
    bracket(96_950, Some(206_700), dec!(0.22)),
    bracket(206_700, Some(394_600), dec!(0.24)),
    bracket(394_600, Some(501_050), dec!(0.32)),
    bracket(501_050, Some(751_600), dec!(0.35)),
    bracket(751_600, None, dec!(0.37)),
];

// Schedule Y-2
const SEPARATE_2025: [TaxBracket; 7] = [
    bracket(0, Some(11_925), dec!(0.10)),
    bracket(11_925, Some(48_475), dec!(0.12)),
    bracket(48_475, Some(103_350), dec!(0.22)),
    bracket(103_350, Some(197_300), dec!(0.24)),
    bracket(197_300, Some(250_525), dec!(0.32)),
    bracket(250_525, Some(375_800), dec!(0.35)),
    bracket(375_800, None, dec!(0.37)),
];

// Schedule Z
const HEAD_OF_HOUSEHOLD_2025: [TaxBracket; 7] = [
    bracket(0, Some(17_000), dec!(0.10)),
    bracket(17_000, Some(64_850), dec!(0.12)),
    bracket(64_850, Some(103_350), dec!(0.22)),
    bracket(103_350, Some(197_300), dec!(0.24)),
    bracket(197_300, Some(250_500), dec!(0.32)),
    bracket(250_500, Some(626_350), dec!(0.35)),
    bracket(626_350, None, dec!(0.37)),
];

impl TaxYearConfig {
    pub const TY2025: TaxYearConfig = TaxYearConfig {
        tax_year: 2025,
        ss_wage_max: Money::dollars(176_100),
        ss_tax_rate: dec!(0.124),
        medicare_tax_rate: dec!(0.029),
        employee_ss_rate: dec!(0.062),
        employee_medicare_rate: dec!(0.0145),
        se_net_earnings_factor: dec!(0.9235),
        se_deduction_factor: dec!(0.50),
        min_se_threshold: Money::dollars(400),
        single_brackets: &SINGLE_2025,
        joint_brackets: &JOINT_2025,
        separate_brackets: &SEPARATE_2025,
        head_of_household_brackets: &HEAD_OF_HOUSEHOLD_2025,
    };

    /// Parameters for `year`, if that year's rules are defined.
    pub fn for_year(year: i32) -> Option<&'static TaxYearConfig> {
        static TY2025: TaxYearConfig = TaxYearConfig::TY2025;
        match year {
            2025 => Some(&TY2025),
            _ => None,
        }
    }

    /// Ordinary income tax rate schedule for a filing status.
    pub fn brackets(
        &self,
        status: FilingStatusCode,
    ) -> &'static [TaxBracket] {
        match status {
            FilingStatusCode::Single => self.single_brackets,
            FilingStatusCode::MarriedFilingJointly
            | FilingStatusCode::QualifyingSurvivingSpouse => self.joint_brackets,
            FilingStatusCode::MarriedFilingSeparately => self.separate_brackets,
            FilingStatusCode::HeadOfHousehold => self.head_of_household_brackets,
        }
    }

    /// Basic standard deduction.
    pub fn standard_deduction(
        &self,
        status: FilingStatusCode,
    ) -> Money {
        match status {
            FilingStatusCode::Single | FilingStatusCode::MarriedFilingSeparately => {
                Money::dollars(15_750)
            }
            FilingStatusCode::MarriedFilingJointly
            | FilingStatusCode::QualifyingSurvivingSpouse => Money::dollars(31_500),
            FilingStatusCode::HeadOfHousehold => Money::dollars(23_625),
        }
    }

    /// Additional standard deduction per 65-or-older / blind checkbox.
    pub fn additional_standard_deduction(
        &self,
        status: FilingStatusCode,
    ) -> Money {
        match status {
            FilingStatusCode::Single | FilingStatusCode::HeadOfHousehold => Money::dollars(2_000),
            _ => Money::dollars(1_600),
        }
    }

    /// Top of the 0% and top of the 15% capital gain rate bands.
    pub fn capital_gain_breakpoints(
        &self,
        status: FilingStatusCode,
    ) -> (Money, Money) {
        match status {
            FilingStatusCode::Single => (Money::dollars(48_350), Money::dollars(533_400)),
            FilingStatusCode::MarriedFilingJointly
            | FilingStatusCode::QualifyingSurvivingSpouse => {
                (Money::dollars(96_700), Money::dollars(600_050))
            }
            FilingStatusCode::MarriedFilingSeparately => {
                (Money::dollars(48_350), Money::dollars(300_000))
            }
            FilingStatusCode::HeadOfHousehold => (Money::dollars(64_750), Money::dollars(566_700)),
        }
    }

    /// Capital loss deductible against ordinary income.
    pub fn capital_loss_limit(
        &self,
        status: FilingStatusCode,
    ) -> Money {
        match status {
            FilingStatusCode::MarriedFilingSeparately => Money::dollars(1_500),
            _ => Money::dollars(3_000),
        }
    }
}
