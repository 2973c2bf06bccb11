//! Renders computations, derivation trails and the state list.
//!
//! | Format | Content |
//! |--------|---------|
//! | text   | Non-zero Form 1040 lines, each state return, findings |
//! | json   | The whole [`ReturnComputation`], trace included |
//! | csv    | One row per reported line: section, key, node, label, amount |

use std::io::{self, Write};

use rust_decimal::Decimal;
use serde::Serialize;
use tax_engine::states::StateComputeResult;
use tax_engine::{
    Line, Money, NodeId, ResidencyType, ReturnComputation, StateRegistry, TraceGraph,
};
use thiserror::Error;

use crate::config::OutputFormat;

/// Form 1040 lines printed even when zero.
const FEDERAL_TOTALS: [&str; 6] = ["11", "15", "24", "33", "34", "37"];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("cannot encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// `explain` was asked about a node the computation never recorded.
    #[error("no traced value with id '{0}'")]
    UnknownNode(NodeId),
}

/// One reported line with its section and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatLine<'a> {
    /// `form1040`, `schedule1`..`schedule3`, or a state code.
    pub section: String,
    pub key: &'static str,
    pub line: &'a Line,
    pub label: &'a str,
}

/// Every reported line, federal first, then states in computed order.
pub fn flat_lines(computation: &ReturnComputation) -> Vec<FlatLine<'_>> {
    let federal = &computation.federal;
    let sections: Vec<(String, Vec<(&'static str, &Line)>)> = [
        ("form1040".to_owned(), computation.form1040.lines()),
        ("schedule1".to_owned(), federal.schedule1.lines()),
        ("schedule2".to_owned(), federal.schedule2.lines()),
        ("schedule3".to_owned(), federal.schedule3.lines()),
    ]
    .into_iter()
    .chain(
        computation
            .states
            .iter()
            .map(|state| (state.state_code.to_string(), state.lines())),
    )
    .collect();

    sections
        .into_iter()
        .flat_map(|(section, lines)| {
            lines.into_iter().map(move |(key, line)| FlatLine {
                section: section.clone(),
                key,
                line,
                label: label_of(&computation.trace, line.id()),
            })
        })
        .collect()
}

fn label_of<'g>(
    trace: &'g TraceGraph,
    id: &NodeId,
) -> &'g str {
    trace.get(id).map(|node| node.label.as_str()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// compute
// ---------------------------------------------------------------------------

pub fn render(
    computation: &ReturnComputation,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<(), RenderError> {
    match format {
        OutputFormat::Text => render_text(computation, out),
        OutputFormat::Json => render_json(computation, out),
        OutputFormat::Csv => render_csv(computation, out),
    }
}

pub fn render_text(
    computation: &ReturnComputation,
    out: &mut impl Write,
) -> Result<(), RenderError> {
    writeln!(out, "Tax year {}", computation.tax_year)?;
    writeln!(out)?;
    writeln!(out, "Form 1040")?;
    for (key, line) in computation.form1040.lines() {
        if line.amount.is_zero() && !FEDERAL_TOTALS.contains(&key) {
            continue;
        }
        write_line(out, key, label_of(&computation.trace, line.id()), line.amount)?;
    }

    for state in &computation.states {
        writeln!(out)?;
        writeln!(out, "{}", state_heading(state))?;
        for (key, line) in state.lines() {
            write_line(out, key, label_of(&computation.trace, line.id()), line.amount)?;
        }
    }

    if !computation.validation.is_empty() {
        writeln!(out)?;
        writeln!(out, "Findings")?;
        for item in &computation.validation {
            write!(out, "  {:<8} {}: {}", item.severity.to_string(), item.code, item.message)?;
            match &item.node_id {
                Some(node) => writeln!(out, " [{node}]")?,
                None => writeln!(out)?,
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "Schedules: {}", computation.schedules_executed.join(", "))?;
    Ok(())
}

fn write_line(
    out: &mut impl Write,
    key: &str,
    label: &str,
    amount: Money,
) -> io::Result<()> {
    writeln!(out, "  {key:>20}  {label:<48} {:>16}", amount.to_string())
}

fn state_heading(state: &StateComputeResult) -> String {
    let residency = match state.residency {
        ResidencyType::FullYear => "full-year resident".to_owned(),
        ResidencyType::PartYear => format!(
            "part-year resident, {}% of the year",
            (state.apportionment_ratio * Decimal::ONE_HUNDRED).round_dp(2)
        ),
        ResidencyType::Nonresident => format!(
            "nonresident, {}% apportioned",
            (state.apportionment_ratio * Decimal::ONE_HUNDRED).round_dp(2)
        ),
    };
    format!("{} {} ({residency})", state.state_code, state.form_name)
}

pub fn render_json(
    computation: &ReturnComputation,
    out: &mut impl Write,
) -> Result<(), RenderError> {
    serde_json::to_writer_pretty(&mut *out, computation)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    section: &'a str,
    key: &'a str,
    node: &'a str,
    label: &'a str,
    amount: Decimal,
}

pub fn render_csv(
    computation: &ReturnComputation,
    out: &mut impl Write,
) -> Result<(), RenderError> {
    let mut writer = csv::Writer::from_writer(out);
    for flat in flat_lines(computation) {
        writer.serialize(CsvRow {
            section: &flat.section,
            key: flat.key,
            node: flat.line.id().as_str(),
            label: flat.label,
            amount: flat.line.amount.to_decimal(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// explain
// ---------------------------------------------------------------------------

/// Prints the derivation trail of `id`, one node per line, indented by
/// depth. A node already expanded higher up is marked and not repeated.
pub fn render_explain(
    trace: &TraceGraph,
    id: &NodeId,
    out: &mut impl Write,
) -> Result<(), RenderError> {
    let steps = trace
        .explain(id)
        .ok_or_else(|| RenderError::UnknownNode(id.clone()))?;
    for step in steps {
        let indent = "  ".repeat(step.depth);
        let node = step.node;
        write!(out, "{indent}{}  {}  {}", node.id, node.value, node.label)?;
        if step.repeated {
            writeln!(out, "  (see above)")?;
        } else {
            writeln!(out)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// states
// ---------------------------------------------------------------------------

pub fn render_states(
    registry: &StateRegistry,
    out: &mut impl Write,
) -> Result<(), RenderError> {
    for module in registry.modules() {
        let meta = module.metadata();
        writeln!(
            out,
            "{}  {:<16} {:<10} nodes {}.*",
            meta.code, meta.name, meta.form_name, meta.node_prefix
        )?;
        writeln!(out, "    templates: {}", meta.template_files.join(", "))?;
        for section in module.review_layout() {
            writeln!(out, "    {}: {}", section.title, section.keys.join(", "))?;
        }
    }
    Ok(())
}
