//! State income-tax modules.
//!
//! Each supported state implements [`StateRulesModule`] and is looked up by
//! [`StateCode`] through a [`StateRegistry`]. A module sees only the
//! finished federal computation and its own [`StateReturnConfig`]; modules
//! never read each other's results.
//!
//! Every module follows the same skeleton: start from federal AGI, apply
//! the state's additions and subtractions, take the state deduction,
//! apply the state rate schedule, scale by the apportionment ratio, apply
//! credits and settle against state withholding. The shared pieces live in
//! [`common`].

pub mod ca;
pub mod common;
pub mod il;
pub mod ky;
pub mod ma;
pub mod nc;
pub mod pa;

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::federal::{FederalComputation, Form1040Result};
use crate::models::{
    FilingStatusCode, ResidencyType, StateCode, StateReturnConfig, TaxReturn, ValidationItem,
};
use crate::trace::{Line, TraceError, TraceScope};

pub use ca::{CaDetail, California};
pub use il::{IlDetail, Illinois};
pub use ky::{KyDetail, Kentucky};
pub use ma::{MaDetail, Massachusetts};
pub use nc::{NcDetail, NorthCarolina};
pub use pa::{PaDetail, Pennsylvania};

/// Static description of a state module, available without computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateMetadata {
    pub code: StateCode,
    pub name: &'static str,
    /// Form name as printed, e.g. `540`.
    pub form_name: &'static str,
    /// Trace node prefix, e.g. `form540`.
    pub node_prefix: &'static str,
    /// Fillable form templates a PDF layer needs for this state.
    pub template_files: &'static [&'static str],
}

/// A group of nodes shown together on the review screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewSection {
    pub title: &'static str,
    /// Node keys under the module's prefix, in display order.
    pub keys: &'static [&'static str],
}

/// Everything a state module may read.
#[derive(Debug, Clone, Copy)]
pub struct StateContext<'a> {
    pub tax_return: &'a TaxReturn,
    pub federal: &'a FederalComputation,
    pub config: &'a StateReturnConfig,
}

impl<'a> StateContext<'a> {
    pub fn form1040(&self) -> &'a Form1040Result {
        &self.federal.form1040
    }

    pub fn filing_status(&self) -> FilingStatusCode {
        self.tax_return.filing_status
    }

    pub fn tax_year(&self) -> i32 {
        self.tax_return.tax_year
    }

    pub fn code(&self) -> StateCode {
        self.config.state_code
    }
}

/// One state's computed return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateComputeResult {
    pub state_code: StateCode,
    pub form_name: String,
    pub residency: ResidencyType,
    /// Share of the year spent resident, in `[0, 1]`.
    pub apportionment_ratio: Decimal,
    pub state_agi: Line,
    /// State AGI scaled by the apportionment ratio.
    pub source_income: Line,
    pub taxable_income: Line,
    /// Tax after apportionment, before credits.
    pub tax: Line,
    pub nonrefundable_credits: Line,
    pub net_tax: Line,
    pub refundable_credits: Line,
    pub withholding: Line,
    pub estimated_payments: Line,
    pub total_payments: Line,
    pub overpaid: Line,
    pub owed: Line,
    pub detail: StateDetail,
    /// Findings specific to this state's computation.
    pub warnings: Vec<ValidationItem>,
}

impl StateComputeResult {
    /// `(key, line)` pairs in display order.
    pub fn lines(&self) -> Vec<(&'static str, &Line)> {
        vec![
            ("stateAgi", &self.state_agi),
            ("sourceIncome", &self.source_income),
            ("taxableIncome", &self.taxable_income),
            ("tax", &self.tax),
            ("nonrefundableCredits", &self.nonrefundable_credits),
            ("netTax", &self.net_tax),
            ("refundableCredits", &self.refundable_credits),
            ("withholding", &self.withholding),
            ("estimatedPayments", &self.estimated_payments),
            ("totalPayments", &self.total_payments),
            ("overpaid", &self.overpaid),
            ("owed", &self.owed),
        ]
    }
}

/// State-specific intermediate results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum StateDetail {
    CA(CaDetail),
    IL(IlDetail),
    KY(KyDetail),
    MA(MaDetail),
    NC(NcDetail),
    PA(PaDetail),
}

/// The contract every state implements.
pub trait StateRulesModule: Send + Sync {
    fn metadata(&self) -> &'static StateMetadata;

    /// Human labels for the node keys this module records.
    fn node_labels(&self) -> &'static [(&'static str, &'static str)];

    fn review_layout(&self) -> &'static [ReviewSection];

    /// Computes the state return, recording every node under `trace`'s
    /// prefix.
    ///
    /// # Errors
    ///
    /// Only trace integrity violations.
    fn compute(
        &self,
        ctx: &StateContext<'_>,
        trace: &mut TraceScope<'_>,
    ) -> Result<StateComputeResult, TraceError>;

    fn code(&self) -> StateCode {
        self.metadata().code
    }

    /// Label for `key`, falling back to the shared settlement labels and
    /// finally to the key itself.
    fn label(
        &self,
        key: &str,
    ) -> String {
        common::label(self.node_labels(), key).to_owned()
    }
}

/// Modules keyed by state code.
pub struct StateRegistry {
    modules: BTreeMap<StateCode, Box<dyn StateRulesModule>>,
}

impl fmt::Debug for StateRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_list().entries(self.modules.keys()).finish()
    }
}

impl StateRegistry {
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Every state this crate implements.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(California));
        registry.register(Box::new(Illinois));
        registry.register(Box::new(Kentucky));
        registry.register(Box::new(Massachusetts));
        registry.register(Box::new(NorthCarolina));
        registry.register(Box::new(Pennsylvania));
        registry
    }

    /// Registers a module, replacing any module already registered for
    /// the same code.
    pub fn register(
        &mut self,
        module: Box<dyn StateRulesModule>,
    ) {
        self.modules.insert(module.code(), module);
    }

    pub fn get(
        &self,
        code: StateCode,
    ) -> Option<&dyn StateRulesModule> {
        self.modules.get(&code).map(|module| module.as_ref())
    }

    /// Registered codes in alphabetical order.
    pub fn codes(&self) -> Vec<StateCode> {
        self.modules.keys().copied().collect()
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn StateRulesModule> {
        self.modules.values().map(|module| module.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtin_registers_every_state_code() {
        let registry = StateRegistry::builtin();

        assert_eq!(registry.codes(), StateCode::ALL.to_vec());
        for code in StateCode::ALL {
            assert_eq!(registry.get(code).map(|m| m.code()), Some(code));
        }
    }

    #[test]
    fn empty_registry_finds_nothing() {
        let registry = StateRegistry::new();

        assert!(registry.get(StateCode::CA).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn node_prefixes_are_unique() {
        let registry = StateRegistry::builtin();
        let mut prefixes: Vec<&str> =
            registry.modules().map(|m| m.metadata().node_prefix).collect();
        prefixes.sort_unstable();
        prefixes.dedup();

        assert_eq!(prefixes.len(), registry.len());
    }

    #[test]
    fn review_layout_keys_have_labels() {
        for module in StateRegistry::builtin().modules() {
            for section in module.review_layout() {
                for key in section.keys {
                    assert_ne!(
                        module.label(key),
                        *key,
                        "{} has no label for {key}",
                        module.metadata().name
                    );
                }
            }
        }
    }
}
