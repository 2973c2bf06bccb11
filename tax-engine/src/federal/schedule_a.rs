//! Schedule A itemized deductions.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{FilingStatusCode, ItemizedDeductions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAResult {
    /// Line 4
    pub medical: Money,
    /// Line 5d
    pub taxes_paid: Money,
    /// SALT limit after the high-income reduction.
    pub salt_limit: Money,
    /// Line 5e
    pub taxes_deducted: Money,
    /// Line 10, after the acquisition-debt limit.
    pub mortgage_interest: Money,
    /// Line 14
    pub charitable: Money,
    /// Line 17
    pub total: Money,
}

struct SaltRule {
    cap: Money,
    phase_down_start: Money,
    floor: Money,
}

fn salt_rule(status: FilingStatusCode) -> SaltRule {
    if status == FilingStatusCode::MarriedFilingSeparately {
        SaltRule {
            cap: Money::dollars(20_000),
            phase_down_start: Money::dollars(250_000),
            floor: Money::dollars(5_000),
        }
    } else {
        SaltRule {
            cap: Money::dollars(40_000),
            phase_down_start: Money::dollars(500_000),
            floor: Money::dollars(10_000),
        }
    }
}

/// State and local tax deduction limit for `magi`.
pub fn salt_limit(
    status: FilingStatusCode,
    magi: Money,
) -> Money {
    let rule = salt_rule(status);
    let reduction = (magi - rule.phase_down_start).max_zero().mul_rate(dec!(0.30));
    (rule.cap - reduction).max(rule.floor)
}

pub fn mortgage_debt_limit(status: FilingStatusCode) -> Money {
    if status == FilingStatusCode::MarriedFilingSeparately {
        Money::dollars(375_000)
    } else {
        Money::dollars(750_000)
    }
}

/// Interest on the part of the average principal within `limit`.
pub fn limited_mortgage_interest(
    interest: Money,
    average_principal: Money,
    limit: Money,
) -> Money {
    let interest = interest.max_zero();
    if average_principal <= limit {
        interest
    } else {
        interest.scale(limit, average_principal)
    }
}

pub fn compute_schedule_a(
    itemized: &ItemizedDeductions,
    status: FilingStatusCode,
    agi: Money,
) -> ScheduleAResult {
    let agi_floor = agi.max_zero();
    let medical =
        (itemized.medical_expenses.max_zero() - agi_floor.mul_rate(dec!(0.075))).max_zero();

    let taxes_paid = itemized.state_local_income_tax.max_zero()
        + itemized.real_estate_taxes.max_zero()
        + itemized.personal_property_taxes.max_zero();
    let salt_limit = salt_limit(status, agi);
    let taxes_deducted = taxes_paid.min(salt_limit);

    let mortgage_interest = limited_mortgage_interest(
        itemized.mortgage_interest,
        itemized.mortgage_principal,
        mortgage_debt_limit(status),
    );

    let cash = itemized.charitable_cash.max_zero().min(agi_floor.mul_rate(dec!(0.60)));
    let noncash = itemized.charitable_noncash.max_zero().min(agi_floor.mul_rate(dec!(0.30)));
    let charitable = (cash + noncash).min(agi_floor.mul_rate(dec!(0.60)));

    ScheduleAResult {
        medical,
        taxes_paid,
        salt_limit,
        taxes_deducted,
        mortgage_interest,
        charitable,
        total: medical + taxes_deducted + mortgage_interest + charitable,
    }
}
