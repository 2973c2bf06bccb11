//! `taxcalc.toml` settings.
//!
//! ```toml
//! [output]
//! format = "text"          # text | json | csv
//!
//! [logging]
//! level = "info"           # any RUST_LOG style directive
//! file = "taxcalc.log"     # appended to; omit for stderr only
//!
//! [states]
//! default = ["CA", "IL"]   # computed when the return selects none
//! ```
//!
//! Every table and key is optional. Command-line flags override the file.

use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tax_engine::StateCode;
use thiserror::Error;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "taxcalc.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An explicitly requested file does not exist.
    #[error("config file {0} not found")]
    NotFound(PathBuf),

    /// The contents are not valid TOML or contain an unknown key.
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatesConfig {
    pub default: Vec<StateCode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub states: StatesConfig,
}

impl Config {
    /// Parses TOML text. `path` is only used in error messages.
    pub fn from_toml_str(
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path`, or returns the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Loads the file named on the command line, which must exist, or the
    /// optional [`DEFAULT_CONFIG_FILE`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load_or_default(path),
            None => Self::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Layers command-line values over the file.
    pub fn apply_overrides(
        &mut self,
        overrides: &Overrides,
    ) {
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = Some(level.clone());
        }
        if let Some(file) = &overrides.log_file {
            self.logging.file = Some(file.clone());
        }
    }
}

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub format: Option<OutputFormat>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::from_toml_str(text, Path::new("taxcalc.toml"))
    }

    // -----------------------------------------------------------------------
    // from_toml_str
    // -----------------------------------------------------------------------

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn every_table_is_read() {
        let config = parse(
            r#"
[output]
format = "csv"

[logging]
level = "debug"
file = "run.log"

[states]
default = ["NC", "CA"]
"#,
        )
        .unwrap();

        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.file, Some(PathBuf::from("run.log")));
        assert_eq!(config.states.default, vec![StateCode::NC, StateCode::CA]);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = parse("[output]\ncolour = true\n").unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(parse("[states]\ndefault = [\"TX\"]\n").is_err());
    }

    // -----------------------------------------------------------------------
    // load
    // -----------------------------------------------------------------------

    #[test]
    fn missing_optional_file_gives_defaults() {
        let config = Config::load_or_default(Path::new("does/not/exist/taxcalc.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("does/not/exist.toml"))).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    // -----------------------------------------------------------------------
    // apply_overrides
    // -----------------------------------------------------------------------

    #[test]
    fn flags_override_file_values() {
        let mut config =
            parse("[output]\nformat = \"json\"\n[logging]\nlevel = \"warn\"\n").unwrap();

        config.apply_overrides(&Overrides {
            format: Some(OutputFormat::Text),
            log_level: None,
            log_file: Some(PathBuf::from("debug.log")),
        });

        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
        assert_eq!(config.logging.file, Some(PathBuf::from("debug.log")));
    }
}
