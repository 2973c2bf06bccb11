//! End-to-end computations over the returns in `tests/fixtures`.
//!
//! The unit tests inside each module build returns in code; these load
//! complete JSON documents the way the CLI does and check the composite
//! result, the trace graph and the cross-cutting properties.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use tax_engine::{Money, NodeId, ReturnComputation, StateCode, TaxEngine, TaxReturn};

const FIXTURES: [&str; 5] = [
    "ira_phase_out.json",
    "ptc_household_of_one.json",
    "kentucky_family.json",
    "nc_part_year.json",
    "household.json",
];

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> TaxReturn {
    let text = std::fs::read_to_string(fixture_path(name)).expect("fixture should be readable");
    serde_json::from_str(&text).expect("fixture should parse")
}

fn compute(name: &str) -> ReturnComputation {
    TaxEngine::default()
        .compute(&load(name))
        .expect("computation should not violate trace integrity")
}

fn node_value(
    result: &ReturnComputation,
    id: &str,
) -> Money {
    result
        .trace
        .get(&NodeId::from(id))
        .unwrap_or_else(|| panic!("missing node {id}"))
        .value
}

// =============================================================================
// Concrete scenarios
// =============================================================================

#[test]
fn covered_single_filer_at_phase_out_midpoint_deducts_half() {
    let result = compute("ira_phase_out.json");

    let ira = &result.federal.ira[0].result;
    assert_eq!(ira.deduction, Money::dollars(3_500));
    assert_eq!(result.federal.schedule1.line20.amount, Money::dollars(3_500));
    assert_eq!(node_value(&result, "ira.taxpayer.deduction"), Money::dollars(3_500));
}

#[test]
fn full_premium_tax_credit_is_refundable_with_no_repayment() {
    let result = compute("ptc_household_of_one.json");

    let ptc = result.federal.premium_tax_credit.as_ref().expect("Form 8962 should run");
    assert!(ptc.eligible);
    assert_eq!(ptc.total_credit, Money::dollars(4_800));
    assert_eq!(ptc.net_credit, ptc.total_credit);
    assert_eq!(ptc.repayment, Money::ZERO);
    assert_eq!(result.federal.refundable_credits.total, Money::dollars(4_800));
    assert_eq!(node_value(&result, "form8962.line29"), Money::ZERO);
    assert!(result.validation.iter().any(|item| item.code == "form8962.reconciled"));
}

#[test]
fn kentucky_family_of_three_at_threshold_owes_no_state_tax() {
    let result = compute("kentucky_family.json");

    let ky = result.state(StateCode::KY).expect("KY should be computed");
    assert!(ky.tax.amount.is_positive());
    assert_eq!(ky.net_tax.amount, Money::ZERO);
    assert_eq!(ky.overpaid.amount, Money::dollars(600));
}

#[test]
fn part_year_resident_from_july_first_pays_apportioned_tax() {
    let result = compute("nc_part_year.json");

    let nc = result.state(StateCode::NC).expect("NC should be computed");
    assert_eq!(nc.apportionment_ratio, Decimal::from(184) / Decimal::from(365));
    assert_eq!(node_value(&result, "d400.fullYearTax"), Money::from_cents(200_813));
    assert_eq!(nc.tax.amount, Money::dollars(1_012));
    assert_eq!(nc.owed.amount, Money::dollars(112));
}

#[test]
fn rsu_sale_with_zero_basis_is_taxed_only_on_gain_since_vest() {
    let result = compute("household.json");

    // 60 delivered shares at $200 on the vest date
    assert_eq!(node_value(&result, "rsu.1.basis"), Money::dollars(12_000));
    assert_eq!(node_value(&result, "form8949.1.gainLoss"), Money::dollars(1_200));
    assert!(result.validation.iter().any(|item| item.code == "rsu.basis-corrected"));
}

#[test]
fn household_runs_both_part_year_states_in_order() {
    let result = compute("household.json");

    let codes: Vec<StateCode> = result.states.iter().map(|s| s.state_code).collect();
    assert_eq!(codes, vec![StateCode::CA, StateCode::IL]);
    let ca = result.state(StateCode::CA).unwrap();
    let il = result.state(StateCode::IL).unwrap();
    assert_eq!(ca.apportionment_ratio, Decimal::from(181) / Decimal::from(365));
    assert_eq!(il.apportionment_ratio, Decimal::from(184) / Decimal::from(365));
    assert!(result.schedules_executed.iter().any(|s| s == "Schedule C"));
    assert!(result.schedules_executed.iter().any(|s| s == "Form 5695"));
}

// =============================================================================
// Properties over every fixture
// =============================================================================

#[test]
fn refund_and_amount_owed_are_exclusive() {
    for name in FIXTURES {
        let result = compute(name);
        let form = &result.form1040;
        assert!(
            !(form.line34.amount.is_positive() && form.line37.amount.is_positive()),
            "{name}: federal refund and balance due both set"
        );
        for state in &result.states {
            assert!(
                !(state.overpaid.amount.is_positive() && state.owed.amount.is_positive()),
                "{name}: {} overpaid and owed both set",
                state.state_code
            );
        }
    }
}

#[test]
fn every_reported_line_is_a_node_with_the_same_value() {
    for name in FIXTURES {
        let result = compute(name);
        let state_lines = result.states.iter().flat_map(|s| s.lines());
        for (key, line) in result.form1040.lines().into_iter().chain(state_lines) {
            let node = result
                .trace
                .get(line.id())
                .unwrap_or_else(|| panic!("{name}: {key} has no node {}", line.id()));
            assert_eq!(node.value, line.amount, "{name}: {key}");
        }
    }
}

#[test]
fn trace_graph_is_acyclic_and_closed() {
    for name in FIXTURES {
        let result = compute(name);
        assert!(result.trace.is_acyclic(), "{name}");
        for node in result.trace.iter() {
            for input in &node.inputs {
                assert!(result.trace.get(input).is_some(), "{name}: {} -> {input}", node.id);
            }
        }
    }
}

#[test]
fn identical_input_gives_identical_output() {
    for name in FIXTURES {
        let tax_return = load(name);
        let engine = TaxEngine::default();

        let first = serde_json::to_string(&engine.compute(&tax_return).unwrap()).unwrap();
        let second = serde_json::to_string(&engine.compute(&tax_return).unwrap()).unwrap();

        assert_eq!(first, second, "{name}");
    }
}

#[test]
fn explain_walks_back_to_source_documents() {
    let result = compute("household.json");

    let trail = result
        .trace
        .explain(&NodeId::from("form540.owed"))
        .expect("node should exist");

    assert_eq!(trail[0].depth, 0);
    assert!(trail.iter().any(|step| step.node.id.as_str() == "w2.1.box1"));
}
