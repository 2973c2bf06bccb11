//! Statutory phase-outs.
//!
//! Every phase-out here rounds the *reduction* up to its rounding unit, so
//! the remaining benefit is always rounded down.

use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;

/// Linear phase-out between `start` and `end` of some income measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOut {
    pub start: Money,
    pub end: Money,
    /// Reduction is rounded up to a multiple of this (e.g. $10).
    pub rounding_unit: Money,
}

impl PhaseOut {
    pub const fn new(
        start: Money,
        end: Money,
        rounding_unit: Money,
    ) -> Self {
        Self {
            start,
            end,
            rounding_unit,
        }
    }

    /// Amount of `full` left after phasing out against `input`.
    ///
    /// Full amount at or below `start`, zero at or above `end`, and in
    /// between `full − ceil(full × (input − start) / (end − start))`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tax_engine::calculations::PhaseOut;
    /// use tax_engine::Money;
    ///
    /// let range = PhaseOut::new(
    ///     Money::dollars(79_000),
    ///     Money::dollars(89_000),
    ///     Money::dollars(10),
    /// );
    ///
    /// assert_eq!(
    ///     range.apply(Money::dollars(7_000), Money::dollars(84_000)),
    ///     Money::dollars(3_500)
    /// );
    /// assert_eq!(range.apply(Money::dollars(7_000), Money::dollars(89_000)), Money::ZERO);
    /// ```
    pub fn apply(
        &self,
        full: Money,
        input: Money,
    ) -> Money {
        if !full.is_positive() {
            return Money::ZERO;
        }
        if input <= self.start {
            return full;
        }
        if input >= self.end || self.end <= self.start {
            return Money::ZERO;
        }

        let fraction = (input - self.start).to_decimal() / (self.end - self.start).to_decimal();
        let raw_reduction = full.to_decimal() * fraction;
        let reduction = if self.rounding_unit.is_positive() {
            let unit = self.rounding_unit.to_decimal();
            (raw_reduction / unit).ceil() * unit
        } else {
            raw_reduction
        };
        let reduction = Money::from_decimal_with(reduction, RoundingStrategy::ToPositiveInfinity);
        (full - reduction).max_zero()
    }
}

/// Stepped phase-out: `reduction_per_step` for each `step` (or part of one)
/// by which `input` exceeds `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteppedPhaseOut {
    pub threshold: Money,
    pub step: Money,
    pub reduction_per_step: Money,
}

impl SteppedPhaseOut {
    pub const fn new(
        threshold: Money,
        step: Money,
        reduction_per_step: Money,
    ) -> Self {
        Self {
            threshold,
            step,
            reduction_per_step,
        }
    }

    pub fn reduction(
        &self,
        input: Money,
    ) -> Money {
        let steps = (input - self.threshold).units_ceil(self.step);
        Money::from_cents(steps.saturating_mul(self.reduction_per_step.cents()))
    }

    pub fn apply(
        &self,
        full: Money,
        input: Money,
    ) -> Money {
        (full - self.reduction(input)).max_zero()
    }
}
