//! Integration tests for the `taxcalc` library pieces against the files in
//! `tests/fixtures`: loading, config defaults, rendering and export.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tax_cli::config::{Config, OutputFormat};
use tax_cli::input::{self, InputError};
use tax_cli::report;
use tax_engine::{NodeId, StateCode, TaxEngine};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn render_to_string(f: impl FnOnce(&mut Vec<u8>) -> Result<(), report::RenderError>) -> String {
    let mut out = Vec::new();
    f(&mut out).expect("render should succeed");
    String::from_utf8(out).expect("output should be UTF-8")
}

// -----------------------------------------------------------------------
// config + input
// -----------------------------------------------------------------------

#[test]
fn config_fixture_supplies_default_states() {
    let config =
        Config::load(Some(fixture_path("taxcalc.toml").as_path())).expect("config should load");
    let mut tax_return =
        input::load_return(&fixture_path("no_states.json")).expect("return should load");

    assert_eq!(config.output.format, OutputFormat::Csv);
    assert!(input::apply_default_states(&mut tax_return, &config.states.default));

    let codes: Vec<StateCode> = tax_return.elections.states.iter().map(|s| s.state_code).collect();
    assert_eq!(codes, vec![StateCode::MA]);
}

#[test]
fn malformed_return_is_a_parse_error() {
    let err = input::load_return(&fixture_path("malformed.json")).unwrap_err();

    assert!(matches!(err, InputError::Parse { .. }));
    assert!(err.to_string().contains("malformed.json"));
}

// -----------------------------------------------------------------------
// compute + render
// -----------------------------------------------------------------------

#[test]
fn csv_report_includes_default_state_lines() {
    let config = Config::load(Some(fixture_path("taxcalc.toml").as_path())).unwrap();
    let mut tax_return = input::load_return(&fixture_path("no_states.json")).unwrap();
    input::apply_default_states(&mut tax_return, &config.states.default);

    let computation = TaxEngine::default().compute(&tax_return).unwrap();
    let csv = render_to_string(|out| report::render(&computation, config.output.format, out));

    assert!(csv.starts_with("section,key,node,label,amount\n"));
    assert!(csv.contains("form1040,1a,form1040.line1a,"));
    assert!(csv.lines().any(|row| {
        row.starts_with("MA,owed,form1.owed,") || row.starts_with("MA,overpaid,form1.overpaid,")
    }));
}

#[test]
fn explain_reaches_the_wage_statement() {
    let mut tax_return = input::load_return(&fixture_path("no_states.json")).unwrap();
    input::select_states(&mut tax_return, &[StateCode::MA]);
    let computation = TaxEngine::default().compute(&tax_return).unwrap();

    let node = NodeId::from("form1.tax");
    let tree = render_to_string(|out| report::render_explain(&computation.trace, &node, out));

    assert!(tree.starts_with("form1.tax  "));
    assert!(tree.contains("w2.1.box1  $88,000.00"));
}

// -----------------------------------------------------------------------
// export
// -----------------------------------------------------------------------

#[test]
fn export_is_stable_across_a_second_pass() {
    let tax_return = input::load_return(&fixture_path("no_states.json")).unwrap();

    let first = input::to_portable_json(&tax_return).unwrap();
    let reparsed = input::parse_return(&first, "export").unwrap();
    let second = input::to_portable_json(&reparsed).unwrap();

    assert_eq!(reparsed, tax_return);
    assert_eq!(first, second);
    assert!(first.contains("\"filing_status\": \"MFJ\""));
}
