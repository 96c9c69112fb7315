//! Ollama generate client
//!
//! Sends one non-streaming request to `{base_url}/api/generate` per oracle
//! call. The stage system prompt travels in the request's `system` field.
//!
//! # Example
//!
//! ```ignore
//! use nl2sql_core::llm::ollama::OllamaClient;
//!
//! let client = OllamaClient::new("http://localhost:11434", "codellama")
//!     .with_timeout(60);
//!
//! let response = client.complete_with_system(system, "Question: ...").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::LlmClient;
use super::error::{LlmError, LlmResult};

/// Client for a local or remote Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout_seconds: u64,
    /// Sent as `num_ctx` and used to size prompts
    max_context_tokens: usize,
    temperature: f32,
    #[cfg(feature = "llm-online")]
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct SamplingOptions {
    temperature: f32,
    num_ctx: usize,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}

impl GenerateResponse {
    fn into_text(self) -> LlmResult<String> {
        if let Some(error) = self.error {
            return Err(LlmError::ModelError(error));
        }
        self.response
            .ok_or_else(|| LlmError::InvalidResponse("response field missing".to_string()))
    }
}

/// Map a non-success HTTP status to an oracle error
#[allow(dead_code)]
fn status_error(status: u16, model: &str, body: &str) -> LlmError {
    match status {
        429 => LlmError::RateLimited(60),
        401 | 403 => {
            LlmError::ConfigError(format!("Ollama rejected the request (HTTP {status}): {body}"))
        }
        404 => LlmError::ModelError(format!(
            "model '{model}' is not pulled on the Ollama server: {body}"
        )),
        408 | 500..=599 => {
            LlmError::ConnectionError(format!("Ollama returned HTTP {status}: {body}"))
        }
        _ => LlmError::InvalidResponse(format!("request rejected (HTTP {status}): {body}")),
    }
}

impl OllamaClient {
    /// Create a client for `model` on the server at `base_url`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout_seconds: 120,
            max_context_tokens: 8192,
            temperature: 0.0,
            #[cfg(feature = "llm-online")]
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_max_context(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(&'a self, system: Option<&'a str>, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            system: system.filter(|s| !s.is_empty()),
            stream: false,
            options: SamplingOptions {
                temperature: self.temperature,
                num_ctx: self.max_context_tokens,
            },
        }
    }

    #[cfg(feature = "llm-online")]
    async fn generate(&self, system: Option<&str>, prompt: &str) -> LlmResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = self.build_request(system, prompt);

        tracing::debug!(url = %url, model = %self.model, "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_seconds)
                } else {
                    LlmError::ConnectionError(format!(
                        "Failed to reach Ollama at {}: {}",
                        self.base_url, e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &self.model, &body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            prompt_tokens = body.prompt_eval_count.unwrap_or(0),
            completion_tokens = body.eval_count.unwrap_or(0),
            "Ollama generate finished"
        );

        body.into_text()
    }

    #[cfg(not(feature = "llm-online"))]
    async fn generate(&self, _system: Option<&str>, _prompt: &str) -> LlmResult<String> {
        Err(LlmError::FeatureNotAvailable(
            "Online LLM".to_string(),
            "llm-online".to_string(),
        ))
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.generate(None, prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> LlmResult<String> {
        self.generate(Some(system), prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> usize {
        self.max_context_tokens
    }

    #[cfg(feature = "llm-online")]
    async fn is_ready(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    #[cfg(not(feature = "llm-online"))]
    async fn is_ready(&self) -> bool {
        false
    }
}
