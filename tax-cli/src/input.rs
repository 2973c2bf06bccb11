//! Reading and writing return documents.
//!
//! A return document is the JSON form of [`TaxReturn`]: amounts are integer
//! cents, dates are `YYYY-MM-DD`, and every collection may be omitted.

use std::io;
use std::path::{Path, PathBuf};

use tax_engine::{StateCode, StateReturnConfig, TaxReturn};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InputError {
    /// The document could not be read from disk.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not a valid return.
    #[error("{origin} is not a valid return: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A `--state` value that names no supported state.
    #[error("unknown state code '{0}' (supported: CA, IL, KY, MA, NC, PA)")]
    UnknownState(String),

    #[error("cannot serialize return: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parses a return document. `origin` names the source in errors.
pub fn parse_return(
    text: &str,
    origin: &str,
) -> Result<TaxReturn, InputError> {
    serde_json::from_str(text).map_err(|source| InputError::Parse {
        origin: origin.to_owned(),
        source,
    })
}

/// Reads and parses the return document at `path`.
pub fn load_return(path: &Path) -> Result<TaxReturn, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let tax_return = parse_return(&text, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        tax_year = tax_return.tax_year,
        documents = tax_return.wage_statements.len()
            + tax_return.interest_statements.len()
            + tax_return.dividend_statements.len()
            + tax_return.brokerage_transactions.len(),
        "return loaded"
    );
    Ok(tax_return)
}

/// `clap` value parser for `--state`.
pub fn parse_state_code(value: &str) -> Result<StateCode, InputError> {
    StateCode::parse(value).ok_or_else(|| InputError::UnknownState(value.to_owned()))
}

/// Restricts the return to `codes`, in that order.
///
/// A code the return already configures keeps its residency and payments;
/// any other code is computed as a full-year resident. An empty `codes`
/// leaves the return untouched.
pub fn select_states(
    tax_return: &mut TaxReturn,
    codes: &[StateCode],
) {
    if codes.is_empty() {
        return;
    }
    let configured = std::mem::take(&mut tax_return.elections.states);
    let mut selected: Vec<StateReturnConfig> = Vec::with_capacity(codes.len());
    for &code in codes {
        if selected.iter().any(|s| s.state_code == code) {
            continue;
        }
        let config = configured
            .iter()
            .find(|s| s.state_code == code)
            .cloned()
            .unwrap_or_else(|| StateReturnConfig::full_year(code));
        selected.push(config);
    }
    tax_return.elections.states = selected;
}

/// Adds full-year configurations for `defaults` when the return selects no
/// state. Returns whether anything was added.
pub fn apply_default_states(
    tax_return: &mut TaxReturn,
    defaults: &[StateCode],
) -> bool {
    if !tax_return.elections.states.is_empty() || defaults.is_empty() {
        return false;
    }
    select_states(tax_return, defaults);
    true
}

/// The portable, pretty-printed JSON form of a return.
pub fn to_portable_json(tax_return: &TaxReturn) -> Result<String, InputError> {
    let mut json = serde_json::to_string_pretty(tax_return)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tax_engine::{Money, ResidencyType};

    fn return_with_states(states: Vec<StateReturnConfig>) -> TaxReturn {
        let mut tax_return = TaxReturn {
            tax_year: 2025,
            ..Default::default()
        };
        tax_return.elections.states = states;
        tax_return
    }

    fn codes(tax_return: &TaxReturn) -> Vec<StateCode> {
        tax_return.elections.states.iter().map(|s| s.state_code).collect()
    }

    // -----------------------------------------------------------------------
    // parse_return
    // -----------------------------------------------------------------------

    #[test]
    fn minimal_document_parses() {
        let text = r#"{ "tax_year": 2025, "filing_status": "HOH" }"#;
        let tax_return = parse_return(text, "inline").unwrap();

        assert_eq!(tax_return.tax_year, 2025);
        assert!(tax_return.wage_statements.is_empty());
    }

    #[test]
    fn bad_filing_status_names_the_origin() {
        let err = parse_return(r#"{ "filing_status": "JOINT" }"#, "return.json").unwrap_err();

        assert!(matches!(err, InputError::Parse { .. }));
        assert!(err.to_string().starts_with("return.json"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_return(Path::new("no/such/return.json")).unwrap_err();

        assert!(matches!(err, InputError::Read { .. }));
    }

    // -----------------------------------------------------------------------
    // parse_state_code
    // -----------------------------------------------------------------------

    #[test]
    fn state_codes_parse_in_any_case() {
        assert_eq!(parse_state_code("nc").unwrap(), StateCode::NC);
        assert!(matches!(
            parse_state_code("TX"),
            Err(InputError::UnknownState(code)) if code == "TX"
        ));
    }

    // -----------------------------------------------------------------------
    // select_states / apply_default_states
    // -----------------------------------------------------------------------

    #[test]
    fn selection_keeps_configured_residency() {
        let mut part_year = StateReturnConfig::full_year(StateCode::CA);
        part_year.residency = ResidencyType::PartYear;
        part_year.estimated_payments = Money::dollars(300);
        let illinois = StateReturnConfig::full_year(StateCode::IL);
        let mut tax_return = return_with_states(vec![part_year.clone(), illinois]);

        select_states(&mut tax_return, &[StateCode::PA, StateCode::CA, StateCode::PA]);

        assert_eq!(codes(&tax_return), vec![StateCode::PA, StateCode::CA]);
        assert_eq!(tax_return.elections.states[1], part_year);
        assert_eq!(tax_return.elections.states[0].residency, ResidencyType::FullYear);
    }

    #[test]
    fn defaults_apply_only_without_configured_states() {
        let mut empty = return_with_states(Vec::new());
        assert!(apply_default_states(&mut empty, &[StateCode::MA]));
        assert_eq!(codes(&empty), vec![StateCode::MA]);

        let mut configured = return_with_states(vec![StateReturnConfig::full_year(StateCode::KY)]);
        assert!(!apply_default_states(&mut configured, &[StateCode::MA]));
        assert_eq!(codes(&configured), vec![StateCode::KY]);
    }

    // -----------------------------------------------------------------------
    // to_portable_json
    // -----------------------------------------------------------------------

    #[test]
    fn portable_json_parses_back_to_the_same_return() {
        let tax_return = return_with_states(vec![StateReturnConfig::full_year(StateCode::NC)]);

        let json = to_portable_json(&tax_return).unwrap();

        assert!(json.ends_with("}\n"));
        assert_eq!(parse_return(&json, "export").unwrap(), tax_return);
    }
}
