//! Oracle client trait and shared call helpers
//!
//! This module defines the `LlmClient` trait, the single text-in/text-out
//! capability the solver consumes, along with retry handling and
//! construction of the configured backend.

use std::time::Duration;

use async_trait::async_trait;

use super::error::{LlmError, LlmResult};
use super::ollama::OllamaClient;
use super::openai::OpenAiClient;
use crate::config::{OracleConfig, OracleMode};

/// Trait for oracle client implementations
///
/// The solver never assumes anything about the returned text beyond it being
/// a string; extraction and parsing decide what is usable.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the given prompt
    async fn complete(&self, prompt: &str) -> LlmResult<String>;

    /// Generate a completion with separate system instructions
    ///
    /// Single-prompt backends get the system text prepended. Chat backends
    /// override this to send it as a system message.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> LlmResult<String> {
        let combined = format!("{}\n\n{}", system.trim(), prompt);
        self.complete(&combined).await
    }

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Get the maximum context size in tokens
    fn max_tokens(&self) -> usize;

    /// Check if the client is ready and connected
    async fn is_ready(&self) -> bool;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        (**self).complete(prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> LlmResult<String> {
        (**self).complete_with_system(system, prompt).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn max_tokens(&self) -> usize {
        (**self).max_tokens()
    }

    async fn is_ready(&self) -> bool {
        (**self).is_ready().await
    }
}

/// Call the oracle, retrying transient failures
///
/// Only errors reporting `is_retryable()` are retried, waiting
/// `retry_after()` seconds between tries. After `max_retries` retries the
/// last error is returned.
pub async fn complete_with_retry<C: LlmClient + ?Sized>(
    client: &C,
    system: &str,
    prompt: &str,
    max_retries: usize,
) -> LlmResult<String> {
    let mut retries = 0;

    loop {
        match client.complete_with_system(system, prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && retries < max_retries => {
                retries += 1;
                let wait = e.retry_after().unwrap_or(1);
                tracing::warn!(
                    error = %e,
                    retry = retries,
                    wait_seconds = wait,
                    "Oracle call failed, retrying"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Build the oracle backend described by the configuration
pub fn client_from_config(config: &OracleConfig) -> LlmResult<Box<dyn LlmClient>> {
    config.validate().map_err(|e| LlmError::ConfigError(e.to_string()))?;

    match config.mode {
        OracleMode::Ollama => Ok(Box::new(
            OllamaClient::new(config.endpoint(), config.model.clone())
                .with_timeout(config.timeout_seconds)
                .with_max_context(config.max_context_tokens)
                .with_temperature(config.temperature),
        )),
        OracleMode::OpenAi => {
            let api_key = config.api_key().ok_or_else(|| {
                LlmError::ConfigError("OpenAI-compatible mode requires an api_key".to_string())
            })?;
            Ok(Box::new(
                OpenAiClient::new(config.endpoint(), config.model.clone(), api_key.to_string())
                    .with_timeout(config.timeout_seconds)
                    .with_max_context(config.max_context_tokens)
                    .with_temperature(config.temperature),
            ))
        }
    }
}

/// A scripted oracle for tests
///
/// Hands out canned responses in order and records every prompt it was
/// given. Once the script runs out the last response repeats.
#[cfg(test)]
pub struct MockLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<LlmResult<String>>>,
    last: std::sync::Mutex<Option<String>>,
    prompts: std::sync::Mutex<Vec<String>>,
    model: String,
}

#[cfg(test)]
impl MockLlmClient {
    /// Create a mock client that always returns the given response
    pub fn new(response: impl Into<String>) -> Self {
        Self::scripted(vec![response.into()])
    }

    /// Create a mock client that returns the responses in order
    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into_iter().map(Ok).collect()),
            last: std::sync::Mutex::new(None),
            prompts: std::sync::Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// Create a mock client whose script includes errors
    pub fn with_results(results: Vec<LlmResult<String>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(results.into_iter().collect()),
            last: std::sync::Mutex::new(None),
            prompts: std::sync::Mutex::new(Vec::new()),
            model: "mock-model".to_string(),
        }
    }

    /// Create a mock client that cannot be reached
    pub fn failing() -> Self {
        Self::with_results(vec![Err(LlmError::ConnectionError(
            "Mock failure".to_string(),
        ))])
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => {
                *self.last.lock().unwrap() = Some(text.clone());
                Ok(text)
            }
            Some(Err(e)) => Err(e),
            None => match self.last.lock().unwrap().clone() {
                Some(text) => Ok(text),
                None => Err(LlmError::ConnectionError("Mock failure".to_string())),
            },
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> usize {
        4096
    }

    async fn is_ready(&self) -> bool {
        true
    }
}
