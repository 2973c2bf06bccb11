//! The orchestrator: federal return first, then each selected state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::entities::RefundableCredits;
use crate::federal::{FederalComputation, FederalSchedules, Form1040Result, compute_federal};
use crate::models::{Severity, StateCode, StateReturnConfig, TaxReturn, ValidationItem};
use crate::states::{StateComputeResult, StateContext, StateRegistry, StateRulesModule};
use crate::trace::{TraceBuilder, TraceError, TraceGraph};
use crate::validation;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("trace integrity violation: {0}")]
    Trace(#[from] TraceError),
}

/// Everything one computation produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnComputation {
    pub tax_year: i32,
    pub form1040: Form1040Result,
    pub federal: FederalSchedules,
    pub states: Vec<StateComputeResult>,
    pub trace: TraceGraph,
    pub validation: Vec<ValidationItem>,
    /// Federal forms and schedules, then state forms, in the order they ran.
    pub schedules_executed: Vec<String>,
}

impl ReturnComputation {
    pub fn state(
        &self,
        code: StateCode,
    ) -> Option<&StateComputeResult> {
        self.states.iter().find(|s| s.state_code == code)
    }

    pub fn has_errors(&self) -> bool {
        self.validation.iter().any(|item| item.severity == Severity::Error)
    }
}

/// Computes returns with a fixed set of state modules and refundable
/// credit providers.
#[derive(Debug, Default)]
pub struct TaxEngine {
    states: StateRegistry,
    refundable_credits: RefundableCredits,
}

impl TaxEngine {
    pub fn new(
        states: StateRegistry,
        refundable_credits: RefundableCredits,
    ) -> Self {
        Self {
            states,
            refundable_credits,
        }
    }

    pub fn with_states(
        mut self,
        states: StateRegistry,
    ) -> Self {
        self.states = states;
        self
    }

    pub fn with_refundable_credits(
        mut self,
        refundable_credits: RefundableCredits,
    ) -> Self {
        self.refundable_credits = refundable_credits;
        self
    }

    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    /// Computes `tax_return` from scratch.
    ///
    /// Every call builds a fresh trace, so the same input always yields the
    /// same result and graph. Findings about the return never fail the
    /// computation; they come back in [`ReturnComputation::validation`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Trace`] if a rule records a node twice or
    /// references a node that was never recorded.
    pub fn compute(
        &self,
        tax_return: &TaxReturn,
    ) -> Result<ReturnComputation, EngineError> {
        let mut validation_items = validation::check_input(tax_return);
        let (config, unsupported) = validation::year_config(tax_return.tax_year);
        validation_items.extend(unsupported);

        info!(
            tax_year = tax_return.tax_year,
            filing_status = tax_return.filing_status.as_str(),
            states = tax_return.elections.states.len(),
            "computing return"
        );

        let mut trace = TraceBuilder::new();
        let federal = compute_federal(tax_return, config, &self.refundable_credits, &mut trace)?;
        validation_items.extend(validation::check_federal(tax_return, config, &federal));

        let (selected, skipped) = validation::select_states(
            &tax_return.elections.states,
            &self.states,
        );
        for item in &skipped {
            warn!(code = %item.code, "{}", item.message);
        }
        validation_items.extend(skipped);

        let mut schedules_executed = federal.schedules_executed.clone();
        let mut states = Vec::with_capacity(selected.len());
        for state_config in selected {
            let Some(module) = self.states.get(state_config.state_code) else {
                continue;
            };
            let result = compute_state(module, tax_return, &federal, state_config, &mut trace)?;
            schedules_executed.push(format!("{} {}", result.state_code, result.form_name));
            validation_items.extend(result.warnings.iter().cloned());
            states.push(result);
        }

        let trace = trace.finish();
        let FederalComputation {
            form1040, schedules, ..
        } = federal;
        let errors = validation_items
            .iter()
            .filter(|item| item.severity == Severity::Error)
            .count();
        info!(
            nodes = trace.len(),
            states = states.len(),
            findings = validation_items.len(),
            errors,
            refund = %form1040.line34.amount,
            owed = %form1040.line37.amount,
            "return computed"
        );

        Ok(ReturnComputation {
            tax_year: tax_return.tax_year,
            form1040,
            federal: schedules,
            states,
            trace,
            validation: validation_items,
            schedules_executed,
        })
    }
}

fn compute_state(
    module: &dyn StateRulesModule,
    tax_return: &TaxReturn,
    federal: &FederalComputation,
    config: &StateReturnConfig,
    trace: &mut TraceBuilder,
) -> Result<StateComputeResult, TraceError> {
    let metadata = module.metadata();
    debug!(state = %metadata.code, prefix = metadata.node_prefix, "computing state return");
    let ctx = StateContext {
        tax_return,
        federal,
        config,
    };
    module.compute(&ctx, &mut trace.scope(metadata.node_prefix))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::calculations::common::Money;
    use crate::models::{FilingStatusCode, Person, StateWageRow, WageStatement};
    use crate::trace::NodeId;

    fn two_state_return() -> TaxReturn {
        let mut tax_return = TaxReturn {
            tax_year: 2025,
            filing_status: FilingStatusCode::Single,
            taxpayer: Person {
                first_name: "Robin".into(),
                date_of_birth: chrono::NaiveDate::from_ymd_opt(1988, 9, 9).unwrap(),
                ..Default::default()
            },
            wage_statements: vec![WageStatement {
                id: "w2-1".into(),
                employer_name: "Acme".into(),
                wages: Money::dollars(70_000),
                federal_withholding: Money::dollars(8_000),
                social_security_wages: Money::dollars(70_000),
                medicare_wages: Money::dollars(70_000),
                state_rows: vec![StateWageRow {
                    state: "CA".into(),
                    state_wages: Money::dollars(70_000),
                    state_withholding: Money::dollars(2_000),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        tax_return.elections.states = vec![
            StateReturnConfig::full_year(StateCode::NC),
            StateReturnConfig::full_year(StateCode::CA),
        ];
        tax_return
    }

    #[test]
    fn states_run_in_configured_order_under_their_prefixes() {
        let result = TaxEngine::default().compute(&two_state_return()).unwrap();

        let codes: Vec<StateCode> = result.states.iter().map(|s| s.state_code).collect();
        assert_eq!(codes, vec![StateCode::NC, StateCode::CA]);
        assert!(result.trace.get(&NodeId::from("d400.ncAgi")).is_some());
        assert!(result.trace.get(&NodeId::from("form540.caAgi")).is_some());
        assert_eq!(
            result.schedules_executed.iter().rev().take(2).collect::<Vec<_>>(),
            vec!["CA 540", "NC D-400"]
        );
    }

    #[test]
    fn state_lines_reference_federal_nodes() {
        let result = TaxEngine::default().compute(&two_state_return()).unwrap();

        let upstream = result.trace.upstream(&NodeId::from("form540.owed"));
        assert!(upstream.contains(&NodeId::from("form1040.line11")));
        assert!(upstream.contains(&NodeId::from("w2.1.box1")));
    }

    #[test]
    fn unregistered_state_is_skipped_with_error() {
        let engine = TaxEngine::default().with_states(StateRegistry::new());

        let result = engine.compute(&two_state_return()).unwrap();

        assert!(result.states.is_empty());
        assert!(result.has_errors());
        assert_eq!(
            result.validation.iter().filter(|i| i.code == "state.unsupported").count(),
            2
        );
    }

    #[test]
    fn unsupported_year_still_computes() {
        let mut tax_return = two_state_return();
        tax_return.tax_year = 2031;

        let result = TaxEngine::default().compute(&tax_return).unwrap();

        assert!(result.validation.iter().any(|i| i.code == "tax-year.unsupported"));
        assert!(result.form1040.line24.amount.is_positive());
    }

    #[test]
    fn repeated_computation_is_identical() {
        let engine = TaxEngine::default();
        let tax_return = two_state_return();

        assert_eq!(engine.compute(&tax_return).unwrap(), engine.compute(&tax_return).unwrap());
    }
}
