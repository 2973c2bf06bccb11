//! Form 1040 worksheets that several schedules share.

pub mod qualified_dividends;
pub mod self_emp;
pub mod social_security;

pub use qualified_dividends::{QualifiedDividendsWorksheet, qualified_dividends_tax};
pub use self_emp::{SeWorksheet, SeWorksheetConfig, SeWorksheetResult};
pub use social_security::{SocialSecurityWorksheet, taxable_social_security};
