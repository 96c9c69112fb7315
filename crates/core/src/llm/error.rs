//! Error types for oracle operations
//!
//! An oracle call fails in one of two ways. Resource errors mean the oracle
//! could not be reached or is not configured; they abort a solve. Format
//! errors mean the oracle answered with something unusable; callers absorb
//! them into a degraded result.

use thiserror::Error;

/// Errors that can occur while talking to an oracle
#[derive(Error, Debug)]
pub enum LlmError {
    /// The service could not be reached
    #[error("Failed to connect to oracle: {0}")]
    ConnectionError(String),

    /// No answer within the configured timeout (seconds)
    #[error("Oracle request timed out after {0} seconds")]
    Timeout(u64),

    /// The service does not know or refused the model
    #[error("Model error: {0}")]
    ModelError(String),

    /// The service answered but the payload carried no usable text
    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),

    /// The text could not be parsed into the expected structure
    #[error("Failed to parse oracle output: {0}")]
    ParseError(String),

    /// Missing or rejected credentials, bad endpoint settings
    #[error("Oracle configuration error: {0}")]
    ConfigError(String),

    /// Too many requests; wait the given number of seconds
    #[error("Rate limited by oracle, retry after {0} seconds")]
    RateLimited(u64),

    /// The crate was built without the backend's feature
    #[error("Oracle backend not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Result type for oracle operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ConnectionError(_) => format!(
                "{self}\n\n\
                Hints:\n\
                - Check the oracle url in the configuration file\n\
                - For Ollama: ensure 'ollama serve' is running"
            ),
            LlmError::Timeout(_) => format!(
                "{self}\n\n\
                Hints:\n\
                - Large schemas make long prompts; try a schema file with fewer tables\n\
                - Increase timeout_seconds in the configuration file"
            ),
            LlmError::RateLimited(_) => format!(
                "{self}\n\nHint: Raise max_retries or wait before solving more questions."
            ),
            LlmError::ModelError(_) => format!(
                "{self}\n\nHint: Check the model name, or run 'ollama pull <model>' for local models."
            ),
            LlmError::ConfigError(_) => format!(
                "{self}\n\n\
                Hints:\n\
                - Set OPENAI_API_KEY or api_key for OpenAI-compatible services\n\
                - Use mode: ollama for local models"
            ),
            LlmError::FeatureNotAvailable(_, flag) => {
                format!("{self}\n\nHint: Rebuild with --features {flag}")
            }
            LlmError::InvalidResponse(_) | LlmError::ParseError(_) => self.to_string(),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::ConnectionError(_) | LlmError::Timeout(_) | LlmError::RateLimited(_)
        )
    }

    /// The oracle is unusable, as opposed to having answered badly
    pub fn is_resource_error(&self) -> bool {
        self.is_retryable()
            || matches!(
                self,
                LlmError::ModelError(_)
                    | LlmError::ConfigError(_)
                    | LlmError::FeatureNotAvailable(_, _)
            )
    }

    /// Seconds to wait before retrying, for retryable errors
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited(secs) => Some(*secs),
            LlmError::Timeout(_) => Some(5),
            LlmError::ConnectionError(_) => Some(2),
            _ => None,
        }
    }
}
