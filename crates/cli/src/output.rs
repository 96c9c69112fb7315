//! Output formatting for CLI

use std::fmt::Write as _;
use std::path::Path;

use nl2sql_core::sql::CellValue;
use nl2sql_core::{AttemptOutcome, Trace};

use crate::error::CliError;

/// Output format shared by the commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Write to `path`, or stdout when absent
pub fn write_output(content: &str, path: Option<&Path>) -> Result<(), CliError> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string()))?;
            eprintln!("Output written to {}", path.display());
        }
        None => println!("{}", content.trim_end()),
    }
    Ok(())
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::SerializationError(e.to_string()))
}

pub fn to_yaml<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_yaml::to_string(value).map_err(|e| CliError::SerializationError(e.to_string()))
}

/// Render a result set as an aligned text table
pub fn format_rows(columns: &[String], rows: &[Vec<CellValue>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(CellValue::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{:<width$}", value, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", line(columns));
    let _ = writeln!(
        out,
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in &cells {
        let _ = writeln!(out, "{}", line(row));
    }
    let noun = if rows.len() == 1 { "row" } else { "rows" };
    let _ = write!(out, "({} {})", rows.len(), noun);
    out
}

/// Render a solve trace for the terminal
pub fn format_trace(trace: &Trace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Question: {}", trace.question);

    let tables = trace.pruned_schema.table_names().join(", ");
    if trace.prune_fell_back {
        let _ = writeln!(out, "Schema: {} (pruning fell back to the full schema)", tables);
    } else {
        let _ = writeln!(out, "Schema: {}", tables);
    }
    let _ = writeln!(out);

    for attempt in &trace.attempts {
        let _ = writeln!(out, "Attempt {}:", attempt.index);
        for line in attempt.sql.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        match &attempt.outcome {
            AttemptOutcome::Success { row_count, .. } => {
                let _ = writeln!(out, "  -> ok, {} rows ({} ms)", row_count, attempt.duration_ms);
            }
            AttemptOutcome::ExecutionError { message } => {
                let _ = writeln!(out, "  -> error: {}", message);
            }
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Status: {} after {} refinement(s) in {} ms",
        trace.status(),
        trace.refinement_count(),
        trace.duration_ms
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Final SQL:");
    let _ = write!(out, "{}", trace.final_sql);
    out
}
