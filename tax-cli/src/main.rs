use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use tax_cli::config::{Config, OutputFormat, Overrides};
use tax_cli::{input, logging, report};
use tax_engine::{NodeId, ReturnComputation, Severity, StateCode, TaxEngine, TaxReturn};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Federal and state individual income tax calculator.
///
/// Reads a return document (JSON), computes Form 1040 and every selected
/// state return, and explains any computed amount back to the documents it
/// came from.
#[derive(Debug, Parser)]
#[command(name = "taxcalc", version, about)]
struct Cli {
    /// Settings file. Defaults to `taxcalc.toml` in the working directory
    /// when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter: a level (`warn`, `debug`, ...) or a RUST_LOG directive.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Append log records to this file as well as stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute a return and print the result.
    Compute {
        /// Return document.
        file: PathBuf,

        /// Output format. Overrides `[output] format`.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Compute only these states, in this order. Repeatable.
        #[arg(long = "state", value_name = "CODE", value_parser = input::parse_state_code)]
        states: Vec<StateCode>,
    },

    /// Print the derivation tree of one computed value.
    Explain {
        /// Return document.
        file: PathBuf,

        /// Node id, e.g. `form1040.line11` or `form540.owed`.
        node: String,
    },

    /// List the supported states with their forms and templates.
    States,

    /// Write the parsed return as portable, pretty-printed JSON.
    Export {
        /// Return document.
        file: PathBuf,

        /// Destination. Standard output when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

// ─── commands ────────────────────────────────────────────────────────────────

fn load(
    path: &Path,
    config: &Config,
    states: &[StateCode],
) -> Result<TaxReturn> {
    let mut tax_return = input::load_return(path).context("Failed to load return")?;
    if states.is_empty() {
        if input::apply_default_states(&mut tax_return, &config.states.default) {
            debug!(states = ?config.states.default, "using default states from config");
        }
    } else {
        input::select_states(&mut tax_return, states);
    }
    Ok(tax_return)
}

fn compute(
    engine: &TaxEngine,
    tax_return: &TaxReturn,
) -> Result<ReturnComputation> {
    engine
        .compute(tax_return)
        .context("Engine failed to compute the return")
}

/// Error findings do not fail the command; they are repeated on stderr for
/// formats that are usually piped.
fn report_errors(computation: &ReturnComputation) {
    for item in computation
        .validation
        .iter()
        .filter(|item| item.severity == Severity::Error)
    {
        warn!(code = %item.code, "{}", item.message);
    }
}

fn run(
    cli: Cli,
    config: Config,
) -> Result<()> {
    let engine = TaxEngine::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Compute { file, states, .. } => {
            let tax_return = load(&file, &config, &states)?;
            let computation = compute(&engine, &tax_return)?;
            report::render(&computation, config.output.format, &mut out)
                .context("Failed to write report")?;
            if config.output.format != OutputFormat::Text {
                report_errors(&computation);
            }
        }
        Command::Explain { file, node } => {
            let tax_return = load(&file, &config, &[])?;
            let computation = compute(&engine, &tax_return)?;
            report::render_explain(&computation.trace, &NodeId::from(node.as_str()), &mut out)
                .with_context(|| format!("Cannot explain {node}"))?;
        }
        Command::States => {
            report::render_states(engine.states(), &mut out).context("Failed to write state list")?;
        }
        Command::Export { file, out: dest } => {
            let tax_return = input::load_return(&file).context("Failed to load return")?;
            let json = input::to_portable_json(&tax_return)?;
            match dest {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write: {}", path.display()))?;
                    info!(path = %path.display(), "return exported");
                }
                None => out.write_all(json.as_bytes())?,
            }
        }
    }

    out.flush()?;
    Ok(())
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load settings")?;
    let format = match &cli.command {
        Command::Compute { format, .. } => *format,
        _ => None,
    };
    config.apply_overrides(&Overrides {
        format,
        log_level: cli.log_level.clone(),
        log_file: cli.log_file.clone(),
    });

    logging::init(config.logging.level.as_deref(), config.logging.file.as_deref())?;
    debug!(?config, "settings resolved");

    run(cli, config)
}
