//! Qualified Dividends and Capital Gain Tax Worksheet (Form 1040 line 16).
//!
//! Splits taxable income into an ordinary slice taxed on the rate schedule
//! and a preferential slice taxed at 0%, 15% and 20%, then keeps the
//! smaller of that total and the plain schedule tax.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::brackets::bracket_tax;
use crate::calculations::common::Money;
use crate::models::{FilingStatusCode, TaxYearConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedDividendsWorksheet {
    /// Line 1
    pub taxable_income: Money,
    /// Line 4: qualified dividends plus net capital gain
    pub preferential_income: Money,
    /// Line 5
    pub ordinary_income: Money,
    /// Line 9
    pub taxed_at_zero: Money,
    /// Line 17
    pub taxed_at_fifteen: Money,
    /// Line 20
    pub taxed_at_twenty: Money,
    /// Line 22
    pub ordinary_tax: Money,
    /// Line 23
    pub worksheet_tax: Money,
    /// Line 24
    pub schedule_tax: Money,
    /// Line 25
    pub tax: Money,
}

/// Runs the worksheet.
///
/// `net_capital_gain` is the smaller of Schedule D lines 15 and 16 (or the
/// capital gain distributions when Schedule D is not needed); a loss
/// contributes nothing.
pub fn qualified_dividends_tax(
    config: &TaxYearConfig,
    status: FilingStatusCode,
    taxable_income: Money,
    qualified_dividends: Money,
    net_capital_gain: Money,
) -> QualifiedDividendsWorksheet {
    let brackets = config.brackets(status);
    let (zero_top, fifteen_top) = config.capital_gain_breakpoints(status);

    let line1 = taxable_income.max_zero();
    let line4 = qualified_dividends.max_zero() + net_capital_gain.max_zero();
    let line5 = (line1 - line4).max_zero();
    let line7 = line1.min(zero_top);
    let line8 = line5.min(line7);
    let line9 = line7 - line8;
    let line10 = line1.min(line4);
    let line12 = line10 - line9;
    let line14 = line1.min(fifteen_top);
    let line15 = line5 + line9;
    let line16 = (line14 - line15).max_zero();
    let line17 = line12.min(line16);
    let line18 = line17.mul_rate(dec!(0.15));
    let line20 = line10 - (line9 + line17);
    let line21 = line20.mul_rate(dec!(0.20));
    let line22 = bracket_tax(brackets, line5);
    let line23 = line18 + line21 + line22;
    let line24 = bracket_tax(brackets, line1);

    QualifiedDividendsWorksheet {
        taxable_income: line1,
        preferential_income: line4,
        ordinary_income: line5,
        taxed_at_zero: line9,
        taxed_at_fifteen: line17,
        taxed_at_twenty: line20,
        ordinary_tax: line22,
        worksheet_tax: line23,
        schedule_tax: line24,
        tax: line23.min(line24),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn run(
        taxable_income: i64,
        qualified: i64,
        gain: i64,
    ) -> QualifiedDividendsWorksheet {
        qualified_dividends_tax(
            &TaxYearConfig::TY2025,
            FilingStatusCode::Single,
            Money::dollars(taxable_income),
            Money::dollars(qualified),
            Money::dollars(gain),
        )
    }

    #[test]
    fn gains_inside_zero_band_are_untaxed() {
        let result = run(40_000, 5_000, 5_000);

        assert_eq!(result.ordinary_income, Money::dollars(30_000));
        assert_eq!(result.taxed_at_zero, Money::dollars(10_000));
        assert_eq!(result.taxed_at_fifteen, Money::ZERO);
        // 1,192.50 + 12% × 18,075
        assert_eq!(result.tax, Money::from_cents(336_150));
    }

    #[test]
    fn gains_straddling_zero_band_split_between_rates() {
        let result = run(60_000, 0, 20_000);

        // Ordinary 40,000; zero band tops out at 48,350.
        assert_eq!(result.taxed_at_zero, Money::dollars(8_350));
        assert_eq!(result.taxed_at_fifteen, Money::dollars(11_650));
        assert_eq!(result.taxed_at_twenty, Money::ZERO);
    }

    #[test]
    fn top_slice_taxed_at_twenty_percent() {
        let result = run(600_000, 0, 100_000);

        assert_eq!(result.taxed_at_zero, Money::ZERO);
        assert_eq!(result.taxed_at_fifteen, Money::dollars(33_400));
        assert_eq!(result.taxed_at_twenty, Money::dollars(66_600));
    }

    #[test]
    fn never_exceeds_schedule_tax() {
        let result = run(30_000, 0, 0);

        assert_eq!(result.tax, result.schedule_tax);
    }

    #[test]
    fn loss_is_ignored() {
        let result = run(50_000, 0, -3_000);

        assert_eq!(result.preferential_income, Money::ZERO);
        assert_eq!(result.tax, result.schedule_tax);
    }
}
