//! Percentage-band interpolation for graduated-rate tables.
//!
//! Used where a rate slides linearly across a band instead of stepping,
//! e.g. the premium tax credit applicable percentage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A band over some percentage axis (`start`..`end`) within which the rate
/// moves linearly from `start_rate` to `end_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentageBand {
    pub start: Decimal,
    pub end: Decimal,
    pub start_rate: Decimal,
    pub end_rate: Decimal,
}

impl PercentageBand {
    pub const fn new(
        start: Decimal,
        end: Decimal,
        start_rate: Decimal,
        end_rate: Decimal,
    ) -> Self {
        Self {
            start,
            end,
            start_rate,
            end_rate,
        }
    }
}

/// Interpolates the rate for `x` over ordered `bands`.
///
/// Values at or below the bottom band's start are 0; values at or above the
/// top band's end take the top band's end rate. A value falling in a gap
/// between bands takes the end rate of the band below it.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_engine::calculations::{interpolate_rate, PercentageBand};
///
/// let bands = [PercentageBand::new(dec!(200), dec!(250), dec!(0.02), dec!(0.04))];
///
/// assert_eq!(interpolate_rate(&bands, dec!(225)), dec!(0.03));
/// assert_eq!(interpolate_rate(&bands, dec!(300)), dec!(0.04));
/// assert_eq!(interpolate_rate(&bands, dec!(150)), dec!(0));
/// ```
pub fn interpolate_rate(
    bands: &[PercentageBand],
    x: Decimal,
) -> Decimal {
    let (Some(first), Some(last)) = (bands.first(), bands.last()) else {
        return Decimal::ZERO;
    };

    if x <= first.start {
        return Decimal::ZERO;
    }
    if x >= last.end {
        return last.end_rate;
    }

    let mut rate = Decimal::ZERO;
    for band in bands {
        if x < band.start {
            break;
        }
        if x >= band.end {
            rate = band.end_rate;
            continue;
        }
        let width = band.end - band.start;
        if width.is_zero() {
            return band.end_rate;
        }
        return band.start_rate + (x - band.start) / width * (band.end_rate - band.start_rate);
    }
    rate
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn bands() -> Vec<PercentageBand> {
        vec![
            PercentageBand::new(dec!(0), dec!(150), dec!(0), dec!(0)),
            PercentageBand::new(dec!(150), dec!(200), dec!(0), dec!(0.02)),
            PercentageBand::new(dec!(200), dec!(250), dec!(0.02), dec!(0.04)),
            PercentageBand::new(dec!(300), dec!(400), dec!(0.06), dec!(0.085)),
        ]
    }

    #[test]
    fn interpolates_inside_band() {
        assert_eq!(interpolate_rate(&bands(), dec!(175)), dec!(0.01));
        assert_eq!(interpolate_rate(&bands(), dec!(350)), dec!(0.0725));
    }

    #[test]
    fn band_start_takes_start_rate() {
        assert_eq!(interpolate_rate(&bands(), dec!(200)), dec!(0.02));
    }

    #[test]
    fn clamps_above_top_band() {
        assert_eq!(interpolate_rate(&bands(), dec!(400)), dec!(0.085));
        assert_eq!(interpolate_rate(&bands(), dec!(1000)), dec!(0.085));
    }

    #[test]
    fn clamps_below_bottom_band() {
        assert_eq!(interpolate_rate(&bands(), dec!(0)), dec!(0));
        assert_eq!(interpolate_rate(&bands(), dec!(-10)), dec!(0));
    }

    #[test]
    fn gap_takes_previous_band_end_rate() {
        assert_eq!(interpolate_rate(&bands(), dec!(275)), dec!(0.04));
    }

    #[test]
    fn empty_table_is_zero() {
        assert_eq!(interpolate_rate(&[], dec!(100)), dec!(0));
    }
}
