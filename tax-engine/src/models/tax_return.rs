//! The engine's input: one filer's complete return for one tax year.
//!
//! Upstream intake (manual entry, broker import, OCR) builds and mutates
//! these records; the engine only reads them. Every document collection
//! item carries a string `id` that stays stable across edits.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::Money;
use crate::models::{FilingStatusCode, StateCode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxReturn {
    pub tax_year: i32,
    pub filing_status: FilingStatusCode,
    pub taxpayer: Person,
    pub spouse: Option<Person>,
    pub dependents: Vec<Dependent>,

    pub wage_statements: Vec<WageStatement>,
    pub interest_statements: Vec<InterestStatement>,
    pub dividend_statements: Vec<DividendStatement>,
    pub brokerage_transactions: Vec<BrokerageTransaction>,
    pub rsu_vests: Vec<RsuVestEvent>,
    pub marketplace_statements: Vec<MarketplaceStatement>,
    pub retirement_distributions: Vec<RetirementDistribution>,
    pub social_security_statements: Vec<SocialSecurityStatement>,
    pub businesses: Vec<Business>,
    pub hsa_accounts: Vec<HsaAccount>,
    pub ira_contributions: Vec<IraContribution>,
    pub energy_improvements: Vec<EnergyImprovement>,

    pub other_income: OtherIncome,
    pub adjustments: Adjustments,
    pub itemized: ItemizedDeductions,
    pub estimated_payments: Money,
    pub elections: Elections,
}

impl TaxReturn {
    /// The person a document belongs to, if present on this return.
    pub fn person(
        &self,
        owner: Owner,
    ) -> Option<&Person> {
        match owner {
            Owner::Taxpayer => Some(&self.taxpayer),
            Owner::Spouse => self.spouse.as_ref(),
        }
    }

    /// Taxpayer plus spouse on a joint return.
    pub fn filers(&self) -> impl Iterator<Item = (Owner, &Person)> {
        let spouse = self
            .spouse
            .as_ref()
            .filter(|_| self.filing_status.is_joint())
            .map(|spouse| (Owner::Spouse, spouse));
        std::iter::once((Owner::Taxpayer, &self.taxpayer)).chain(spouse)
    }

    /// Filers plus dependents.
    pub fn household_size(&self) -> usize {
        self.filers().count() + self.dependents.len()
    }

    /// Number of 65-or-older and blind checkboxes across the filers.
    pub fn age_and_blindness_boxes(&self) -> u32 {
        self.filers()
            .map(|(_, person)| {
                u32::from(person.age_at_year_end(self.tax_year) >= 65) + u32::from(person.is_blind)
            })
            .sum()
    }

    pub fn state_config(
        &self,
        code: StateCode,
    ) -> Option<&StateReturnConfig> {
        self.elections.states.iter().find(|s| s.state_code == code)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Owner {
    #[default]
    Taxpayer,
    Spouse,
}

impl Owner {
    /// Trace key segment.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Taxpayer => "taxpayer",
            Self::Spouse => "spouse",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    pub date_of_birth: NaiveDate,
    pub is_blind: bool,
    pub is_disabled: bool,
}

impl Person {
    /// Age on December 31 of `tax_year`.
    ///
    /// A person born on January 1 is treated as reaching that age on the
    /// preceding December 31.
    pub fn age_at_year_end(
        &self,
        tax_year: i32,
    ) -> i32 {
        age_at_year_end(self.date_of_birth, tax_year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dependent {
    pub first_name: String,
    pub last_name: String,
    pub ssn: String,
    pub relationship: String,
    pub date_of_birth: NaiveDate,
    pub months_lived_with_filer: u8,
    pub is_student: bool,
    pub is_disabled: bool,
}

impl Dependent {
    pub fn age_at_year_end(
        &self,
        tax_year: i32,
    ) -> i32 {
        age_at_year_end(self.date_of_birth, tax_year)
    }

    fn lived_with_filer_over_half_year(&self) -> bool {
        self.months_lived_with_filer > 6
    }

    /// Under 17 at year end and lived with the filer more than half the year.
    pub fn is_child_tax_credit_child(
        &self,
        tax_year: i32,
    ) -> bool {
        self.lived_with_filer_over_half_year() && self.age_at_year_end(tax_year) < 17
    }

    /// Earned-income-credit age test: under 19, under 24 and a student, or disabled.
    pub fn is_earned_income_child(
        &self,
        tax_year: i32,
    ) -> bool {
        let age = self.age_at_year_end(tax_year);
        self.lived_with_filer_over_half_year()
            && (age < 19 || (self.is_student && age < 24) || self.is_disabled)
    }
}

fn age_at_year_end(
    date_of_birth: NaiveDate,
    tax_year: i32,
) -> i32 {
    let age = tax_year - date_of_birth.year();
    if date_of_birth.month() == 1 && date_of_birth.day() == 1 {
        age + 1
    } else {
        age
    }
}

// ─── income documents ───────────────────────────────────────────────────────

/// Form W-2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WageStatement {
    pub id: String,
    pub employer_name: String,
    pub employer_ein: String,
    pub owner: Owner,
    /// Box 1
    pub wages: Money,
    /// Box 2
    pub federal_withholding: Money,
    /// Box 3
    pub social_security_wages: Money,
    /// Box 4
    pub social_security_withholding: Money,
    /// Box 5
    pub medicare_wages: Money,
    /// Box 6
    pub medicare_withholding: Money,
    /// Box 12
    pub box12: Vec<Box12Entry>,
    /// Box 13 "Retirement plan"
    pub retirement_plan: bool,
    /// Boxes 15-17
    pub state_rows: Vec<StateWageRow>,
}

impl WageStatement {
    /// Sum of box 12 amounts with the given code.
    pub fn box12_total(
        &self,
        code: &str,
    ) -> Money {
        self.box12
            .iter()
            .filter(|entry| entry.code.trim().eq_ignore_ascii_case(code))
            .map(|entry| entry.amount)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Box12Entry {
    pub code: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateWageRow {
    /// Postal code as printed on the form; may name an unsupported state.
    pub state: String,
    pub state_wages: Money,
    pub state_withholding: Money,
}

/// Form 1099-INT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestStatement {
    pub id: String,
    pub payer: String,
    pub owner: Owner,
    /// Box 1
    pub interest: Money,
    /// Box 3: U.S. savings bonds and Treasury obligations. Federally
    /// taxable; most states exclude it.
    pub us_obligation_interest: Money,
    /// Box 8
    pub tax_exempt_interest: Money,
    /// Postal code of the state that issued the box 8 bonds, if known.
    pub tax_exempt_issuer_state: Option<String>,
    /// Box 4
    pub federal_withholding: Money,
}

/// Form 1099-DIV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividendStatement {
    pub id: String,
    pub payer: String,
    pub owner: Owner,
    /// Box 1a
    pub ordinary_dividends: Money,
    /// Box 1b
    pub qualified_dividends: Money,
    /// Box 2a
    pub capital_gain_distributions: Money,
    /// Box 12
    pub exempt_interest_dividends: Money,
    /// Box 4
    pub federal_withholding: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingTerm {
    Short,
    Long,
}

/// One sale reported on Form 1099-B.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerageTransaction {
    pub id: String,
    pub description: String,
    pub symbol: String,
    pub cusip: Option<String>,
    pub date_acquired: Option<NaiveDate>,
    pub date_sold: NaiveDate,
    pub shares: Decimal,
    pub proceeds: Money,
    pub cost_basis: Money,
    pub wash_sale_disallowed: Money,
    /// Term as reported by the broker, when it reports one.
    pub reported_term: Option<HoldingTerm>,
}

impl BrokerageTransaction {
    /// Reported term, else long when held more than one year.
    pub fn term(&self) -> HoldingTerm {
        if let Some(term) = self.reported_term {
            return term;
        }
        match self.date_acquired {
            Some(acquired) => {
                let anniversary = acquired
                    .with_year(acquired.year() + 1)
                    .unwrap_or_else(|| acquired + chrono::Days::new(365));
                if self.date_sold > anniversary {
                    HoldingTerm::Long
                } else {
                    HoldingTerm::Short
                }
            }
            None => HoldingTerm::Short,
        }
    }
}

/// One RSU vesting event from an equity-compensation statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsuVestEvent {
    pub id: String,
    pub symbol: String,
    pub cusip: Option<String>,
    pub vest_date: NaiveDate,
    pub shares_vested: Decimal,
    /// Shares sold or withheld by the employer to cover taxes.
    pub shares_withheld: Decimal,
    pub fmv_per_share: Money,
}

impl RsuVestEvent {
    pub fn shares_delivered(&self) -> Decimal {
        (self.shares_vested - self.shares_withheld).max(Decimal::ZERO)
    }
}

/// Form 1095-A.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceStatement {
    pub id: String,
    pub policy_number: String,
    pub months: Vec<MarketplaceMonth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceMonth {
    /// 1 = January.
    pub month: u32,
    /// Column A
    pub enrollment_premium: Money,
    /// Column B (second lowest cost silver plan)
    pub benchmark_premium: Money,
    /// Column C
    pub advance_credit: Money,
}

/// Form 1099-R.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetirementDistribution {
    pub id: String,
    pub payer: String,
    pub owner: Owner,
    /// Box 1
    pub gross_distribution: Money,
    /// Box 2a
    pub taxable_amount: Money,
    /// IRA/SEP/SIMPLE checkbox
    pub is_ira: bool,
    /// Box 4
    pub federal_withholding: Money,
}

/// Form SSA-1099.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialSecurityStatement {
    pub id: String,
    pub owner: Owner,
    /// Box 5
    pub net_benefits: Money,
    /// Box 6
    pub federal_withholding: Money,
}

/// A sole proprietorship reported on Schedule C.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub owner: Owner,
    pub gross_receipts: Money,
    pub returns_and_allowances: Money,
    pub cost_of_goods_sold: Money,
    pub expenses: Money,
    pub home_office: Option<HomeOffice>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomeOfficeMethod {
    /// $5 per square foot, up to 300 square feet.
    #[default]
    Simplified,
    /// Form 8829 actual expenses.
    Actual,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeOffice {
    pub method: HomeOfficeMethod,
    pub office_square_feet: u32,
    pub home_square_feet: u32,
    /// Expenses only for the office itself (deducted in full).
    pub direct_expenses: Money,
    pub mortgage_interest: Money,
    pub real_estate_taxes: Money,
    pub insurance: Money,
    pub utilities: Money,
    pub repairs: Money,
    pub rent: Money,
    /// Home cost or value, excluding land.
    pub home_basis: Money,
    pub placed_in_service: Option<NaiveDate>,
    /// Disallowed operating expenses and depreciation carried in from last year.
    pub prior_year_carryover: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdhpCoverage {
    #[default]
    SelfOnly,
    Family,
}

/// Form 8889 inputs for one account holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsaAccount {
    pub id: String,
    pub owner: Owner,
    pub coverage: HdhpCoverage,
    /// Months of HDHP coverage. Omitted means the whole year; `0` means
    /// no eligible coverage, so every contribution is excess.
    pub months_covered: Option<u8>,
    pub personal_contributions: Money,
    /// Employer contributions not already reported in W-2 box 12 code W.
    pub other_employer_contributions: Money,
    pub distributions: Money,
    pub qualified_medical_expenses: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IraContribution {
    pub id: String,
    pub owner: Owner,
    pub traditional: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyImprovementKind {
    // Residential clean energy property
    SolarElectric,
    SolarWaterHeating,
    SmallWind,
    Geothermal,
    BatteryStorage,
    // Energy efficient home improvements
    Windows,
    ExteriorDoors,
    Insulation,
    CentralAirConditioner,
    WaterHeater,
    Furnace,
    ElectricPanel,
    HeatPump,
    HeatPumpWaterHeater,
    BiomassStove,
    HomeEnergyAudit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyImprovement {
    #[serde(default)]
    pub id: String,
    pub kind: EnergyImprovementKind,
    pub cost: Money,
}

// ─── adjustments, deductions and elections ──────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtherIncome {
    /// Form 1099-G box 1
    pub unemployment_compensation: Money,
    pub other: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    pub educator_expenses: Money,
    pub student_loan_interest: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemizedDeductions {
    pub medical_expenses: Money,
    pub state_local_income_tax: Money,
    pub real_estate_taxes: Money,
    pub personal_property_taxes: Money,
    pub mortgage_interest: Money,
    /// Average outstanding principal on acquisition debt.
    pub mortgage_principal: Money,
    pub charitable_cash: Money,
    pub charitable_noncash: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeductionMethod {
    /// Whichever of standard and itemized is larger.
    #[default]
    Auto,
    Standard,
    Itemized,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Elections {
    pub deduction_method: DeductionMethod,
    /// States to compute, in the order the filer selected them.
    pub states: Vec<StateReturnConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidencyType {
    #[default]
    FullYear,
    PartYear,
    Nonresident,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReturnConfig {
    pub state_code: StateCode,
    #[serde(default)]
    pub residency: ResidencyType,
    #[serde(default)]
    pub residency_start: Option<NaiveDate>,
    #[serde(default)]
    pub residency_end: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_payments: Money,
    #[serde(default)]
    pub rented_principal_residence: bool,
    #[serde(default)]
    pub rent_paid: Money,
    /// Property tax paid on the principal residence in this state.
    #[serde(default)]
    pub property_tax_paid: Money,
    /// Replaces the 1099-INT box 3 total for this state's subtraction.
    #[serde(default)]
    pub us_obligation_interest_override: Option<Money>,
    /// Tax-exempt interest from other states' bonds, when the documents
    /// do not name the issuing state.
    #[serde(default)]
    pub other_state_municipal_interest: Option<Money>,
}

impl StateReturnConfig {
    pub fn full_year(state_code: StateCode) -> Self {
        Self {
            state_code,
            residency: ResidencyType::FullYear,
            residency_start: None,
            residency_end: None,
            estimated_payments: Money::ZERO,
            rented_principal_residence: false,
            rent_paid: Money::ZERO,
            property_tax_paid: Money::ZERO,
            us_obligation_interest_override: None,
            other_state_municipal_interest: None,
        }
    }
}
