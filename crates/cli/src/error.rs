//! CLI error types

use std::path::PathBuf;

use nl2sql_core::llm::LlmError;
use nl2sql_core::sql::ExecutorError;
use nl2sql_core::{ConfigError, SchemaError, SolveError};
use thiserror::Error;

/// Errors raised by command handlers
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Failed to serialize output: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Oracle(#[from] LlmError),

    #[error(transparent)]
    Database(#[from] ExecutorError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    /// The statement ran but SQLite rejected it
    #[error("Statement failed: {0}")]
    StatementFailed(String),
}

impl CliError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(e) => e.user_message(),
            CliError::Schema(e) => e.user_message(),
            CliError::Oracle(e) => e.user_message(),
            CliError::Database(e) => e.user_message(),
            CliError::Solve(e) => e.user_message(),
            CliError::FileReadError(path, _) => {
                format!("{self}\n\nHint: Check that {} exists and is readable.", path.display())
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_delegates_to_core() {
        let err = CliError::from(ConfigError::InvalidValue {
            field: "oracle.api_key".into(),
            message: "required for OpenAI-compatible backends".into(),
        });
        assert!(err.user_message().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_file_read_hint() {
        let err = CliError::FileReadError(PathBuf::from("/tmp/missing.txt"), "not found".into());
        assert!(err.user_message().contains("Hint:"));
        assert!(err.to_string().contains("/tmp/missing.txt"));
    }
}
