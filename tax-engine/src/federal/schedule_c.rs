//! Schedule C, profit or loss from a sole proprietorship.

use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::entities::home_office::{HomeOfficeResult, compute_home_office};
use crate::models::{Business, Owner};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCResult {
    pub business_id: String,
    pub name: String,
    pub owner: Owner,
    /// Line 7
    pub gross_income: Money,
    /// Line 28
    pub expenses: Money,
    /// Line 29
    pub tentative_profit: Money,
    /// Line 30 details.
    pub home_office: Option<HomeOfficeResult>,
    /// Line 31
    pub net_profit: Money,
}

impl ScheduleCResult {
    pub fn home_office_deduction(&self) -> Money {
        self.home_office
            .as_ref()
            .map_or(Money::ZERO, |office| office.deduction)
    }
}

pub fn compute_schedule_c(
    business: &Business,
    tax_year: i32,
) -> ScheduleCResult {
    let gross_income =
        business.gross_receipts - business.returns_and_allowances - business.cost_of_goods_sold;
    let expenses = business.expenses.max_zero();
    let tentative_profit = gross_income - expenses;
    let home_office = business
        .home_office
        .as_ref()
        .map(|office| compute_home_office(office, tentative_profit, tax_year));
    let home_office_deduction = home_office.as_ref().map_or(Money::ZERO, |o| o.deduction);

    ScheduleCResult {
        business_id: business.id.clone(),
        name: business.name.clone(),
        owner: business.owner,
        gross_income,
        expenses,
        tentative_profit,
        home_office,
        net_profit: tentative_profit - home_office_deduction,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::HomeOffice;

    #[test]
    fn profit_after_home_office() {
        let business = Business {
            id: "biz-1".into(),
            gross_receipts: Money::dollars(60_000),
            returns_and_allowances: Money::dollars(1_000),
            cost_of_goods_sold: Money::dollars(9_000),
            expenses: Money::dollars(10_000),
            home_office: Some(HomeOffice {
                office_square_feet: 200,
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = compute_schedule_c(&business, 2025);

        assert_eq!(result.gross_income, Money::dollars(50_000));
        assert_eq!(result.tentative_profit, Money::dollars(40_000));
        assert_eq!(result.home_office_deduction(), Money::dollars(1_000));
        assert_eq!(result.net_profit, Money::dollars(39_000));
    }

    #[test]
    fn loss_gets_no_home_office_deduction() {
        let business = Business {
            gross_receipts: Money::dollars(5_000),
            expenses: Money::dollars(8_000),
            home_office: Some(HomeOffice {
                office_square_feet: 100,
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = compute_schedule_c(&business, 2025);

        assert_eq!(result.home_office_deduction(), Money::ZERO);
        assert_eq!(result.net_profit, Money::dollars(-3_000));
    }
}
