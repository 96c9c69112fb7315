//! OpenAI-compatible chat completions client
//!
//! Works against the OpenAI API and any service exposing the same
//! `/chat/completions` contract (vLLM, LM Studio, Azure-style gateways).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::LlmClient;
use super::error::{LlmError, LlmResult};

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: String,
    timeout_seconds: u64,
    max_context_tokens: usize,
    temperature: f32,
    #[cfg(feature = "llm-online")]
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[allow(dead_code)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl ChatResponse {
    /// Text of the first choice
    fn into_text(self) -> LlmResult<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))
    }
}

/// Map a non-success HTTP status to an oracle error
///
/// Rejected requests are format errors; only server-side failures are
/// retried.
#[allow(dead_code)]
fn status_error(status: u16, model: &str, body: &str, retry_after: Option<u64>) -> LlmError {
    match status {
        429 => LlmError::RateLimited(retry_after.unwrap_or(60)),
        401 | 403 => LlmError::ConfigError(format!("credential rejected (HTTP {status}): {body}")),
        404 => LlmError::ModelError(format!(
            "model '{model}' not available (HTTP {status}): {body}"
        )),
        408 | 500..=599 => {
            LlmError::ConnectionError(format!("chat completions error (HTTP {status}): {body}"))
        }
        _ => LlmError::InvalidResponse(format!("request rejected (HTTP {status}): {body}")),
    }
}

impl OpenAiClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API base, including the version segment (e.g., "https://api.openai.com/v1")
    /// * `model` - Model identifier
    /// * `api_key` - Bearer credential
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_seconds: 120,
            max_context_tokens: 8192,
            temperature: 0.0,
            #[cfg(feature = "llm-online")]
            client: reqwest::Client::new(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the maximum context tokens
    pub fn with_max_context(mut self, tokens: usize) -> Self {
        self.max_context_tokens = tokens;
        self
    }

    /// Set the temperature for sampling
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(&'a self, system: Option<&'a str>, prompt: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        }
    }

    #[cfg(feature = "llm-online")]
    async fn chat(&self, system: Option<&str>, prompt: &str) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(system, prompt);

        tracing::debug!("Sending chat completion request: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(std::time::Duration::from_secs(self.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_seconds)
                } else {
                    LlmError::ConnectionError(format!(
                        "Failed to reach {}: {}",
                        self.base_url, e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(
                status.as_u16(),
                &self.model,
                &error_text,
                retry_after,
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        if let Some(usage) = &chat.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion finished"
            );
        }

        chat.into_text()
    }
}

#[cfg(feature = "llm-online")]
#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.chat(None, prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> LlmResult<String> {
        self.chat(Some(system), prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> usize {
        self.max_context_tokens
    }

    async fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(not(feature = "llm-online"))]
#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, _prompt: &str) -> LlmResult<String> {
        Err(LlmError::FeatureNotAvailable(
            "Online LLM".to_string(),
            "llm-online".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> usize {
        self.max_context_tokens
    }

    async fn is_ready(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_with_system_message() {
        let client = OpenAiClient::new("https://api.openai.com/v1", "gpt-4o-mini", "sk-test")
            .with_temperature(0.3);
        let request = client.build_request(Some("You are an SQL expert."), "Question: x");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Question: x");
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_request_without_system_message() {
        let client = OpenAiClient::new("http://localhost:8000/v1", "local", "key");
        let request = client.build_request(None, "prompt");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
    }

    #[test]
    fn test_response_first_choice() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "SELECT 1;"}},
                {"message": {"role": "assistant", "content": "SELECT 2;"}}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_response_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_status_error_classification() {
        let err = status_error(400, "gpt-4o", "context_length_exceeded", None);
        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert!(!err.is_retryable());
        assert!(!err.is_resource_error());
        assert!(!status_error(422, "gpt-4o", "", None).is_retryable());

        assert!(status_error(500, "gpt-4o", "", None).is_retryable());
        assert!(status_error(503, "gpt-4o", "overloaded", None).is_retryable());
        assert_eq!(status_error(429, "gpt-4o", "", Some(7)).retry_after(), Some(7));
        assert!(matches!(
            status_error(401, "gpt-4o", "", None),
            LlmError::ConfigError(_)
        ));
        assert!(matches!(
            status_error(404, "gpt-4o", "", None),
            LlmError::ModelError(_)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = OpenAiClient::new("https://api.openai.com/v1", "gpt-4o", "sk-secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
    }
}
