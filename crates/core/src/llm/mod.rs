//! Oracle access for the solver
//!
//! The solver consumes a single capability: send a prompt, get text back.
//! This module defines that capability ([`LlmClient`]), its error type, the
//! prompt templates for each solver stage, and two HTTP backends.
//!
//! # Example
//!
//! ```ignore
//! use nl2sql_core::config::OracleConfig;
//! use nl2sql_core::llm::{LlmClient, client_from_config};
//!
//! let config = OracleConfig::ollama("codellama");
//! let client = client_from_config(&config)?;
//! let text = client.complete("Question: how many employees are there?").await?;
//! ```
//!
//! # Feature Flags
//!
//! - `llm-online`: Enable the Ollama and OpenAI-compatible HTTP clients
//!
//! Without it both clients still construct, but every call returns
//! [`LlmError::FeatureNotAvailable`].

pub mod client;
pub mod error;
pub mod ollama;
pub mod openai;
pub mod prompt;

// Re-export main types
pub use client::{LlmClient, client_from_config, complete_with_retry};
pub use error::{LlmError, LlmResult};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use prompt::{PromptContext, Stage, estimate_tokens};

#[cfg(test)]
pub use client::MockLlmClient;
