//! Business use of home: the simplified method, or Form 8829 actual
//! expenses with depreciation of the office's share of the home.
//!
//! Either way the deduction cannot exceed the business's profit before
//! it. Everything above the limit is reported as a non-deductible
//! carryforward. Only the actual method's operating expenses and
//! depreciation carry to next year's Form 8829; the simplified method's
//! excess is informational.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{Money, round_ratio};
use crate::models::{HomeOffice, HomeOfficeMethod};

const SIMPLIFIED_RATE: Money = Money::dollars(5);
const SIMPLIFIED_MAX_SQUARE_FEET: u32 = 300;
/// Nonresidential real property recovery period, in years.
const RECOVERY_YEARS: Decimal = dec!(39);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeOfficeResult {
    pub method: HomeOfficeMethod,
    /// Office share of the home, to four places.
    pub business_percentage: Decimal,
    /// Mortgage interest and real estate taxes (Form 8829 line 14).
    pub tier_one: Money,
    /// Operating expenses, including direct expenses.
    pub tier_two: Money,
    pub depreciation: Money,
    /// Everything that would be deductible without the profit limit.
    pub tentative_deduction: Money,
    /// Schedule C line 30.
    pub deduction: Money,
    /// Tentative deduction the profit limit disallowed this year.
    pub carryforward: Money,
    /// The part of `carryforward` that Form 8829 carries to next year
    /// (operating expenses and depreciation). Always zero for the
    /// simplified method.
    pub form8829_carryover: Money,
}

/// Depreciation of the office share of the home for `tax_year`.
///
/// Mid-month convention: the first year counts the month placed in service
/// as half a month.
pub fn depreciation(
    depreciable_basis: Money,
    placed_in_service: Option<NaiveDate>,
    tax_year: i32,
) -> Money {
    let annual = depreciable_basis.max_zero().to_decimal() / RECOVERY_YEARS;
    let fraction = match placed_in_service {
        Some(date) if date.year() > tax_year => Decimal::ZERO,
        Some(date) if date.year() == tax_year => {
            (Decimal::from(12 - date.month()) + dec!(0.5)) / dec!(12)
        }
        _ => Decimal::ONE,
    };
    Money::from_decimal(annual * fraction)
}

/// Deduction for one office against `tentative_profit` (Schedule C line 29).
pub fn compute_home_office(
    office: &HomeOffice,
    tentative_profit: Money,
    tax_year: i32,
) -> HomeOfficeResult {
    let profit_limit = tentative_profit.max_zero();
    match office.method {
        HomeOfficeMethod::Simplified => {
            let square_feet = office.office_square_feet.min(SIMPLIFIED_MAX_SQUARE_FEET);
            let tentative = Money::from_cents(SIMPLIFIED_RATE.cents() * i64::from(square_feet));
            let deduction = tentative.min(profit_limit);
            HomeOfficeResult {
                method: HomeOfficeMethod::Simplified,
                business_percentage: business_percentage(office),
                tier_one: Money::ZERO,
                tier_two: Money::ZERO,
                depreciation: Money::ZERO,
                tentative_deduction: tentative,
                deduction,
                carryforward: tentative - deduction,
                form8829_carryover: Money::ZERO,
            }
        }
        HomeOfficeMethod::Actual => actual_expenses(office, profit_limit, tax_year),
    }
}

fn business_percentage(office: &HomeOffice) -> Decimal {
    if office.home_square_feet == 0 {
        return Decimal::ZERO;
    }
    let share = Decimal::from(office.office_square_feet) / Decimal::from(office.home_square_feet);
    round_ratio(share.min(Decimal::ONE), 4)
}

fn actual_expenses(
    office: &HomeOffice,
    profit_limit: Money,
    tax_year: i32,
) -> HomeOfficeResult {
    let pct = business_percentage(office);

    let tier_one = (office.mortgage_interest + office.real_estate_taxes).mul_rate(pct);
    let tier_two = office.direct_expenses
        + (office.insurance + office.utilities + office.repairs + office.rent).mul_rate(pct);
    let depreciation = depreciation(
        office.home_basis.mul_rate(pct),
        office.placed_in_service,
        tax_year,
    );
    // The carryover is applied after the current year's operating expenses
    // and depreciation.
    let tier_three = depreciation + office.prior_year_carryover.max_zero();

    let allowed_one = tier_one.min(profit_limit);
    let remaining = profit_limit - allowed_one;
    let allowed_two = tier_two.min(remaining);
    let remaining = remaining - allowed_two;
    let allowed_three = tier_three.min(remaining);

    let tentative_deduction = tier_one + tier_two + tier_three;
    let deduction = allowed_one + allowed_two + allowed_three;
    HomeOfficeResult {
        method: HomeOfficeMethod::Actual,
        business_percentage: pct,
        tier_one,
        tier_two,
        depreciation,
        tentative_deduction,
        deduction,
        carryforward: tentative_deduction - deduction,
        // Excess mortgage interest and taxes are not carried; they remain
        // deductible on Schedule A.
        form8829_carryover: (tier_two - allowed_two) + (tier_three - allowed_three),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn actual_office() -> HomeOffice {
        HomeOffice {
            method: HomeOfficeMethod::Actual,
            office_square_feet: 200,
            home_square_feet: 2_000,
            mortgage_interest: Money::dollars(10_000),
            real_estate_taxes: Money::dollars(5_000),
            utilities: Money::dollars(3_000),
            insurance: Money::dollars(1_000),
            home_basis: Money::dollars(390_000),
            placed_in_service: Some(date(2020, 5, 1)),
            ..Default::default()
        }
    }

    // =========================================================================
    // depreciation tests
    // =========================================================================

    #[test]
    fn full_year_after_first_year() {
        let result = depreciation(Money::dollars(39_000), Some(date(2019, 3, 1)), 2025);

        assert_eq!(result, Money::dollars(1_000));
    }

    #[test]
    fn mid_month_in_first_year() {
        // July: 5.5 months of 12.
        let result = depreciation(Money::dollars(39_000), Some(date(2025, 7, 15)), 2025);

        assert_eq!(result, Money::from_cents(45_833));
    }

    #[test]
    fn placed_in_service_later_is_zero() {
        assert_eq!(
            depreciation(Money::dollars(39_000), Some(date(2026, 1, 1)), 2025),
            Money::ZERO
        );
    }

    // =========================================================================
    // compute_home_office tests
    // =========================================================================

    #[test]
    fn simplified_caps_square_feet() {
        let office = HomeOffice {
            office_square_feet: 400,
            ..Default::default()
        };

        let result = compute_home_office(&office, Money::dollars(10_000), 2025);

        assert_eq!(result.deduction, Money::dollars(1_500));
        assert_eq!(result.carryforward, Money::ZERO);
    }

    #[test]
    fn simplified_excess_over_profit_is_reported_but_not_carried() {
        let office = HomeOffice {
            office_square_feet: 300,
            ..Default::default()
        };

        let result = compute_home_office(&office, Money::dollars(600), 2025);

        assert_eq!(result.tentative_deduction, Money::dollars(1_500));
        assert_eq!(result.deduction, Money::dollars(600));
        assert_eq!(result.carryforward, result.tentative_deduction - result.deduction);
        assert_eq!(result.form8829_carryover, Money::ZERO);
    }

    #[test]
    fn simplified_loss_reports_the_whole_tentative_deduction() {
        let office = HomeOffice {
            office_square_feet: 100,
            ..Default::default()
        };

        let result = compute_home_office(&office, Money::dollars(-2_000), 2025);

        assert_eq!(result.deduction, Money::ZERO);
        assert_eq!(result.carryforward, Money::dollars(500));
    }

    #[test]
    fn actual_method_with_ample_profit() {
        let result = compute_home_office(&actual_office(), Money::dollars(50_000), 2025);

        assert_eq!(result.business_percentage, dec!(0.1));
        assert_eq!(result.tier_one, Money::dollars(1_500));
        assert_eq!(result.tier_two, Money::dollars(400));
        assert_eq!(result.depreciation, Money::dollars(1_000));
        assert_eq!(result.deduction, Money::dollars(2_900));
        assert_eq!(result.carryforward, Money::ZERO);
        assert_eq!(result.form8829_carryover, Money::ZERO);
    }

    #[test]
    fn actual_method_carries_forward_what_profit_cannot_absorb() {
        let result = compute_home_office(&actual_office(), Money::dollars(1_700), 2025);

        assert_eq!(result.deduction, Money::dollars(1_700));
        // 200 of operating expenses and all 1,000 of depreciation.
        assert_eq!(result.carryforward, Money::dollars(1_200));
        assert_eq!(result.form8829_carryover, Money::dollars(1_200));
    }

    #[test]
    fn actual_method_reports_mortgage_and_taxes_over_profit_without_carrying_them() {
        let result = compute_home_office(&actual_office(), Money::dollars(1_000), 2025);

        assert_eq!(result.deduction, Money::dollars(1_000));
        // 500 of tier one, 400 of operating expenses, 1,000 of depreciation.
        assert_eq!(result.carryforward, Money::dollars(1_900));
        assert_eq!(result.form8829_carryover, Money::dollars(1_400));
    }
}
