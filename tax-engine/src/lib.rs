//! US federal and multi-state individual income tax engine.
//!
//! [`TaxEngine::compute`] turns a [`TaxReturn`] into a Form 1040, one
//! result per configured state and a [`TraceGraph`] that explains every
//! computed amount in terms of the amounts it was computed from.

pub mod calculations;
pub mod engine;
pub mod entities;
pub mod federal;
pub mod models;
pub mod states;
pub mod trace;
pub mod validation;

pub use calculations::common::Money;
pub use engine::{EngineError, ReturnComputation, TaxEngine};
pub use federal::{FederalComputation, FederalSchedules, Form1040Result};
pub use models::*;
pub use states::{StateComputeResult, StateMetadata, StateRegistry, StateRulesModule};
pub use trace::{Line, NodeId, TraceBuilder, TraceError, TraceGraph, TracedValue};
