//! The `taxcalc` command-line front end for `tax-engine`.

pub mod config;
pub mod input;
pub mod logging;
pub mod report;
