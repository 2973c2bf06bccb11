//! Single-purpose rule modules.
//!
//! Each takes values that are already known (never the total it feeds)
//! and returns a typed result, or `None` when the rule does not apply to
//! the filer.

pub mod child_tax_credit;
pub mod earned_income_credit;
pub mod energy_credits;
pub mod home_office;
pub mod hsa;
pub mod ira;
pub mod other_taxes;
pub mod premium_tax_credit;
pub mod qbi;
pub mod refundable;
pub mod rsu;
pub mod student_loan;

pub use child_tax_credit::{ChildTaxCreditInput, ChildTaxCreditResult, compute_child_tax_credit};
pub use earned_income_credit::{
    EarnedIncomeCreditInput, EarnedIncomeCreditResult, compute_earned_income_credit,
};
pub use energy_credits::{EnergyCreditsResult, compute_energy_credits};
pub use home_office::{HomeOfficeResult, compute_home_office};
pub use hsa::{HsaInput, HsaResult, compute_hsa};
pub use ira::{IraDeductionInput, IraDeductionResult, PlanCoverage, compute_ira_deduction};
pub use other_taxes::{
    AdditionalMedicareResult, NetInvestmentIncomeResult, compute_additional_medicare,
    compute_net_investment_income_tax,
};
pub use premium_tax_credit::{
    PremiumTaxCreditInput, PremiumTaxCreditResult, compute_premium_tax_credit,
};
pub use qbi::{QbiResult, compute_qbi};
pub use refundable::{
    RefundableCreditContext, RefundableCreditItem, RefundableCreditProvider, RefundableCredits,
    RefundableCreditsResult,
};
pub use rsu::{AdjustedSale, RsuBasisResult, RsuMatch, correct_rsu_basis};
pub use student_loan::{StudentLoanInterestResult, compute_student_loan_interest};
