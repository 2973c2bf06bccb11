//! Numeric primitives and IRS worksheet implementations.
//!
//! This module provides the money type, the bracket evaluator, band
//! interpolation and phase-out helpers shared by every rule module, plus
//! the stand-alone worksheets in [`worksheets`].

pub mod bands;
pub mod brackets;
pub mod common;
pub mod phase_out;
pub mod worksheets;

pub use bands::{PercentageBand, interpolate_rate};
pub use brackets::{bracket_tax, bracket_tax_exact, marginal_rate};
pub use common::{Money, round_half_up, round_ratio};
pub use phase_out::{PhaseOut, SteppedPhaseOut};
