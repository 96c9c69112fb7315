//! Trace of one solve invocation
//!
//! Attempts are recorded in execution order. A trace is built by the loop
//! and handed back to the caller once complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::Schema;
use crate::sql::ExecutionResult;

/// Result of executing one attempt's statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success { columns: Vec<String>, row_count: usize },
    ExecutionError { message: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AttemptOutcome::ExecutionError { message } => Some(message),
            AttemptOutcome::Success { .. } => None,
        }
    }
}

impl From<&ExecutionResult> for AttemptOutcome {
    fn from(result: &ExecutionResult) -> Self {
        match result {
            ExecutionResult::Rows { columns, rows } => AttemptOutcome::Success {
                columns: columns.clone(),
                row_count: rows.len(),
            },
            ExecutionResult::Failure { message } => AttemptOutcome::ExecutionError {
                message: message.clone(),
            },
        }
    }
}

/// One executed candidate statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Position in the trace, starting at 0 for the generated statement
    pub index: usize,
    /// Statement that was executed
    pub sql: String,
    /// Statement this one was refined from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sql: Option<String>,
    pub outcome: AttemptOutcome,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

/// How a solve invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The last attempt executed successfully
    Success,
    /// The refinement budget ran out with the last attempt still failing
    Exhausted,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Success => write!(f, "success"),
            Termination::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Complete record of a solve invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub question: String,
    /// Schema the generation and refinement prompts used
    pub pruned_schema: Schema,
    /// Whether pruning fell back to the full schema
    pub prune_fell_back: bool,
    pub attempts: Vec<Attempt>,
    pub final_sql: String,
    /// Wall time of the whole invocation in milliseconds
    pub duration_ms: u64,
}

impl Trace {
    /// Termination state, read from the last attempt
    pub fn status(&self) -> Termination {
        match self.attempts.last() {
            Some(attempt) if attempt.outcome.is_success() => Termination::Success,
            _ => Termination::Exhausted,
        }
    }

    /// Number of refinement calls made
    pub fn refinement_count(&self) -> usize {
        self.attempts.len().saturating_sub(1)
    }

    /// Reporting view of the trace
    pub fn to_report(&self) -> TraceReport {
        let attempts = self
            .attempts
            .iter()
            .enumerate()
            .map(|(i, attempt)| AttemptReport {
                index: attempt.index,
                sql_before: attempt.sql.clone(),
                error: attempt.outcome.error_message().map(str::to_string),
                sql_after: self.attempts.get(i + 1).map(|next| next.sql.clone()),
            })
            .collect();

        TraceReport {
            question: self.question.clone(),
            pruned_schema: self.pruned_schema.clone(),
            attempts,
            final_sql: self.final_sql.clone(),
        }
    }
}

/// Reporting format for downstream tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceReport {
    pub question: String,
    pub pruned_schema: Schema,
    pub attempts: Vec<AttemptReport>,
    pub final_sql: String,
}

/// One attempt in the reporting format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub index: usize,
    pub sql_before: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_after: Option<String>,
}
