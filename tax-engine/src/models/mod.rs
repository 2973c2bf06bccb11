mod filing_status;
mod state_code;
mod tax_bracket;
mod tax_return;
mod tax_year_config;
mod validation;

pub use filing_status::FilingStatusCode;
pub use state_code::StateCode;
pub use tax_bracket::TaxBracket;
pub use tax_return::{
    Adjustments, Box12Entry, BrokerageTransaction, Business, DeductionMethod, Dependent,
    DividendStatement, Elections, EnergyImprovement, EnergyImprovementKind, HdhpCoverage,
    HoldingTerm, HomeOffice, HomeOfficeMethod, HsaAccount, InterestStatement, IraContribution,
    ItemizedDeductions, MarketplaceMonth, MarketplaceStatement, OtherIncome, Owner, Person,
    ResidencyType, RetirementDistribution, RsuVestEvent, SocialSecurityStatement, StateReturnConfig,
    StateWageRow, TaxReturn, WageStatement,
};
pub use tax_year_config::TaxYearConfig;
pub use validation::{Severity, ValidationItem};
