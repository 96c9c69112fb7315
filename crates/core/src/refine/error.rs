//! Error types for the refinement loop
//!
//! Only resource problems surface here. Malformed oracle output and failing
//! statements are recorded in the trace instead.

use thiserror::Error;

use crate::llm::LlmError;
use crate::llm::prompt::Stage;
use crate::schema::SchemaError;
use crate::sql::ExecutorError;

/// Errors that abort a solve invocation
#[derive(Error, Debug)]
pub enum SolveError {
    /// The schema breaks its uniqueness invariants
    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// The database target cannot be opened
    #[error("Database unavailable: {0}")]
    Database(#[from] ExecutorError),

    /// The oracle could not be reached or is misconfigured
    #[error("Oracle failed during {stage}: {source}")]
    Oracle {
        stage: Stage,
        #[source]
        source: LlmError,
    },
}

impl SolveError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SolveError::InvalidSchema(e) => e.user_message(),
            SolveError::Database(e) => e.user_message(),
            SolveError::Oracle { stage, source } => {
                format!("The oracle failed during {}. {}", stage, source.user_message())
            }
        }
    }
}

/// Result type for solve operations
pub type SolveResult<T> = Result<T, SolveError>;
