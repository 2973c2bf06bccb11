//! Schedule SE (Form 1040) self-employment tax.
//!
//! | Line | Description |
//! |------|-------------|
//! | 2    | Net profit from Schedule C |
//! | 4a   | Line 2 × 92.35% |
//! | 4c   | Line 4a, or zero when it is under $400 |
//! | 7    | Maximum earnings subject to social security tax |
//! | 8d   | Wages already subject to social security tax |
//! | 9    | Line 7 minus line 8d, not below zero |
//! | 10   | Smaller of line 4c or line 9, × 12.4% |
//! | 11   | Line 4c × 2.9% |
//! | 12   | Self-employment tax: line 10 + line 11 |
//! | 13   | Deductible part: line 12 × 50% (Schedule 1, line 15) |
//!
//! # Example
//!
//! ```
//! use tax_engine::calculations::worksheets::{SeWorksheet, SeWorksheetConfig};
//! use tax_engine::{Money, TaxYearConfig};
//!
//! let config = SeWorksheetConfig::from_tax_year_config(&TaxYearConfig::TY2025);
//! let worksheet = SeWorksheet::new(config);
//! let result = worksheet.calculate(Money::dollars(100_000), Money::dollars(50_000));
//!
//! assert_eq!(result.self_employment_tax, Money::from_cents(1_412_955));
//! assert_eq!(result.se_tax_deduction, Money::from_cents(706_478));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::common::Money;
use crate::models::TaxYearConfig;

/// Rates and limits Schedule SE needs for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeWorksheetConfig {
    /// Line 7.
    pub ss_wage_max: Money,
    /// Combined social security rate (line 10).
    pub ss_tax_rate: Decimal,
    /// Combined Medicare rate (line 11).
    pub medicare_tax_rate: Decimal,
    /// Line 4a multiplier.
    pub net_earnings_factor: Decimal,
    /// Line 13 multiplier.
    pub deduction_factor: Decimal,
    /// Net earnings under this owe no self-employment tax.
    pub min_se_threshold: Money,
}

impl SeWorksheetConfig {
    pub fn from_tax_year_config(config: &TaxYearConfig) -> Self {
        Self {
            ss_wage_max: config.ss_wage_max,
            ss_tax_rate: config.ss_tax_rate,
            medicare_tax_rate: config.medicare_tax_rate,
            net_earnings_factor: config.se_net_earnings_factor,
            deduction_factor: config.se_deduction_factor,
            min_se_threshold: config.min_se_threshold,
        }
    }
}

/// One person's Schedule SE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeWorksheetResult {
    /// Line 2.
    pub net_profit: Money,
    /// Line 4c (zero when under the threshold).
    pub net_earnings: Money,
    /// Line 9.
    pub remaining_ss_base: Money,
    /// Smaller of line 4c and line 9.
    pub ss_taxable_earnings: Money,
    /// Line 10.
    pub social_security_tax: Money,
    /// Line 11.
    pub medicare_tax: Money,
    /// Line 12.
    pub self_employment_tax: Money,
    /// Line 13.
    pub se_tax_deduction: Money,
    pub below_threshold: bool,
}

#[derive(Debug, Clone)]
pub struct SeWorksheet {
    config: SeWorksheetConfig,
}

impl SeWorksheet {
    pub fn new(config: SeWorksheetConfig) -> Self {
        Self { config }
    }

    /// Computes Schedule SE for `net_profit` when the same person already had
    /// `ss_wages` subject to social security tax on W-2s.
    pub fn calculate(
        &self,
        net_profit: Money,
        ss_wages: Money,
    ) -> SeWorksheetResult {
        let net_earnings = self.net_earnings_from_self_employment(net_profit);

        if net_earnings < self.config.min_se_threshold {
            debug!(
                %net_profit,
                %net_earnings,
                threshold = %self.config.min_se_threshold,
                "net earnings under the self-employment threshold; no SE tax"
            );
            return SeWorksheetResult {
                net_profit,
                below_threshold: true,
                ..Default::default()
            };
        }

        let remaining_ss_base = self.remaining_ss_wage_base(ss_wages);
        let ss_taxable_earnings = net_earnings.min(remaining_ss_base);
        let social_security_tax = ss_taxable_earnings.mul_rate(self.config.ss_tax_rate);
        let medicare_tax = net_earnings.mul_rate(self.config.medicare_tax_rate);
        let self_employment_tax = social_security_tax + medicare_tax;

        SeWorksheetResult {
            net_profit,
            net_earnings,
            remaining_ss_base,
            ss_taxable_earnings,
            social_security_tax,
            medicare_tax,
            self_employment_tax,
            se_tax_deduction: self_employment_tax.mul_rate(self.config.deduction_factor),
            below_threshold: false,
        }
    }

    /// Line 4a; a loss yields zero.
    fn net_earnings_from_self_employment(
        &self,
        net_profit: Money,
    ) -> Money {
        net_profit
            .max_zero()
            .mul_rate(self.config.net_earnings_factor)
    }

    /// Line 9.
    fn remaining_ss_wage_base(
        &self,
        ss_wages: Money,
    ) -> Money {
        let remaining = self.config.ss_wage_max - ss_wages;
        if !remaining.is_positive() {
            debug!(
                %ss_wages,
                wage_base = %self.config.ss_wage_max,
                "wages already reach the social security wage base"
            );
        }
        remaining.max_zero()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn worksheet() -> SeWorksheet {
        SeWorksheet::new(SeWorksheetConfig::from_tax_year_config(
            &TaxYearConfig::TY2025,
        ))
    }

    #[test]
    fn profit_without_wages() {
        let result = worksheet().calculate(Money::dollars(100_000), Money::ZERO);

        assert_eq!(result.net_earnings, Money::dollars(92_350));
        assert_eq!(result.social_security_tax, Money::from_cents(1_145_140));
        assert_eq!(result.medicare_tax, Money::from_cents(267_815));
        assert_eq!(result.self_employment_tax, Money::from_cents(1_412_955));
        assert_eq!(result.se_tax_deduction, Money::from_cents(706_478));
    }

    #[test]
    fn wages_use_up_part_of_the_wage_base() {
        let result = worksheet().calculate(Money::dollars(80_000), Money::dollars(150_000));

        assert_eq!(result.net_earnings, Money::dollars(73_880));
        assert_eq!(result.remaining_ss_base, Money::dollars(26_100));
        assert_eq!(result.ss_taxable_earnings, Money::dollars(26_100));
        assert_eq!(result.social_security_tax, Money::from_cents(323_640));
    }

    #[test]
    fn wages_above_wage_base_leave_only_medicare() {
        let result = worksheet().calculate(Money::dollars(50_000), Money::dollars(200_000));

        assert_eq!(result.social_security_tax, Money::ZERO);
        assert_eq!(result.medicare_tax, Money::from_cents(133_908));
        assert_eq!(result.self_employment_tax, result.medicare_tax);
    }

    #[test]
    fn under_threshold_owes_nothing() {
        // 433 × 0.9235 = 399.88
        let result = worksheet().calculate(Money::dollars(433), Money::ZERO);

        assert!(result.below_threshold);
        assert_eq!(result.self_employment_tax, Money::ZERO);
    }

    #[test]
    fn loss_owes_nothing() {
        let result = worksheet().calculate(Money::dollars(-5_000), Money::ZERO);

        assert!(result.below_threshold);
        assert_eq!(result.net_profit, Money::dollars(-5_000));
        assert_eq!(result.se_tax_deduction, Money::ZERO);
    }
}
