//! Common utility functions and the money type shared by every calculation.
//!
//! All amounts in the engine are whole cents held in [`Money`]. Rates,
//! ratios and share counts are [`Decimal`]; a product of the two is turned
//! back into cents exactly once, through one of the rounding helpers below.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_engine::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a ratio or rate to `dp` decimal places, half away from zero.
pub fn round_ratio(
    value: Decimal,
    dp: u32,
) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// An amount of money in whole cents.
///
/// Serializes as a bare integer number of cents. Arithmetic saturates at
/// the ends of the `i64` range instead of overflowing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole dollars.
    pub const fn dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    pub fn max_zero(self) -> Self {
        Self(self.0.max(0))
    }

    /// The amount as decimal dollars (`12345` cents becomes `123.45`).
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts decimal dollars to cents, rounding half away from zero.
    pub fn from_decimal(dollars: Decimal) -> Self {
        Self::from_decimal_with(dollars, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Converts decimal dollars to cents with an explicit rounding strategy.
    ///
    /// Values outside the `i64` range saturate.
    pub fn from_decimal_with(
        dollars: Decimal,
        strategy: RoundingStrategy,
    ) -> Self {
        let cents = (dollars * Decimal::ONE_HUNDRED).round_dp_with_strategy(0, strategy);
        Self(cents.to_i64().unwrap_or(if cents.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        }))
    }

    /// Multiplies by a rate and rounds to the nearest cent.
    pub fn mul_rate(
        self,
        rate: Decimal,
    ) -> Self {
        Self::from_decimal(self.to_decimal() * rate)
    }

    /// Multiplies by a rate and drops any fractional cent.
    pub fn mul_rate_floor(
        self,
        rate: Decimal,
    ) -> Self {
        Self::from_decimal_with(self.to_decimal() * rate, RoundingStrategy::ToNegativeInfinity)
    }

    /// Multiplies by `numerator / denominator`, rounded to the nearest cent.
    ///
    /// A zero denominator yields zero.
    pub fn scale(
        self,
        numerator: Money,
        denominator: Money,
    ) -> Self {
        if denominator.is_zero() {
            return Self::ZERO;
        }
        let ratio = Decimal::from(numerator.0) / Decimal::from(denominator.0);
        self.mul_rate(ratio)
    }

    /// Rounds to the nearest whole dollar (50 cents rounds up).
    pub fn round_to_dollar(self) -> Self {
        Self::from_decimal_with(
            self.to_decimal().round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            RoundingStrategy::MidpointAwayFromZero,
        )
    }

    /// Rounds up to the next multiple of `unit`.
    pub fn round_up_to(
        self,
        unit: Money,
    ) -> Self {
        if unit.0 <= 0 {
            return self;
        }
        Self(-((-self.0).div_euclid(unit.0)) * unit.0)
    }

    /// Rounds down to the previous multiple of `unit`.
    pub fn round_down_to(
        self,
        unit: Money,
    ) -> Self {
        if unit.0 <= 0 {
            return self;
        }
        Self(self.0.div_euclid(unit.0) * unit.0)
    }

    /// Number of whole-or-partial `unit`s contained in `self` (ceiling division).
    pub fn units_ceil(
        self,
        unit: Money,
    ) -> i64 {
        if unit.0 <= 0 || self.0 <= 0 {
            return 0;
        }
        -((-self.0).div_euclid(unit.0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(
        self,
        rhs: Money,
    ) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(
        &mut self,
        rhs: Money,
    ) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(
        self,
        rhs: Money,
    ) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(
        &mut self,
        rhs: Money,
    ) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, ch) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{sign}${grouped}.{cents:02}")
    }
}
