use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;

/// One marginal-rate bracket: income above `min_income` and up to
/// `max_income` (unbounded when `None`) is taxed at `tax_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub min_income: Money,
    pub max_income: Option<Money>,
    pub tax_rate: Decimal,
}

impl TaxBracket {
    pub const fn new(
        min_income: Money,
        max_income: Option<Money>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            min_income,
            max_income,
            tax_rate,
        }
    }

    /// Bracket from whole-dollar bounds, for rate tables.
    pub const fn from_dollars(
        min: i64,
        max: Option<i64>,
        tax_rate: Decimal,
    ) -> Self {
        let max_income = match max {
            Some(max) => Some(Money::dollars(max)),
            None => None,
        };
        Self::new(Money::dollars(min), max_income, tax_rate)
    }
}
