//! Configuration types for the solver
//!
//! This module provides the configuration consumed when a solver is
//! constructed: the refinement budget, which oracle to call, and the
//! credentials and sampling parameters for that oracle.
//!
//! Configuration is usually loaded from a YAML file:
//!
//! ```yaml
//! max_iterations: 3
//! oracle:
//!   mode: open_ai
//!   url: https://api.openai.com/v1
//!   model: gpt-4o-mini
//!   api_key: sk-...
//! ```
//!
//! Agent configuration files name one section per stage instead. Each
//! section overrides the `oracle` section for that stage only:
//!
//! ```yaml
//! max_iterations: 3
//! selector:
//!   model: gpt-4o-mini
//!   openai_api_key: sk-...
//! decomposer:
//!   model: gpt-4-turbo
//! refiner:
//!   model: gpt-4-turbo
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::prompt::Stage;

/// Environment variable consulted for OpenAI-compatible credentials
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for this schema
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is present but unusable
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Read { path, .. } => format!(
                "{self}\n\nHint: Check that {} exists and is readable.",
                path.display()
            ),
            ConfigError::InvalidValue { field, .. } if field.ends_with(".api_key") => format!(
                "{self}\n\nHint: Set api_key in the configuration file or export {OPENAI_API_KEY_ENV}."
            ),
            _ => self.to_string(),
        }
    }
}

/// Oracle backend selection
///
/// - `Ollama`: a locally hosted Ollama server
/// - `OpenAi`: any OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OracleMode {
    /// Ollama API
    Ollama,

    /// OpenAI-compatible chat completions API
    #[default]
    OpenAi,
}

impl OracleMode {
    /// Default endpoint for the backend
    pub fn default_url(&self) -> &'static str {
        match self {
            OracleMode::Ollama => "http://localhost:11434",
            OracleMode::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Check if the backend needs a credential
    pub fn requires_api_key(&self) -> bool {
        matches!(self, OracleMode::OpenAi)
    }
}

/// Configuration for the oracle the solver calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Backend selection
    #[serde(default)]
    pub mode: OracleMode,

    /// Endpoint override; the backend default is used when absent
    #[serde(default)]
    pub url: Option<String>,

    /// Model identifier (e.g., "gpt-4o-mini", "llama3.2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Credential for backends that need one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Temperature for sampling (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum context tokens
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Retries for transient oracle failures (connection, timeout, rate limit)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_context_tokens() -> usize {
    8192
}

fn default_max_retries() -> usize {
    2
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: OracleMode::default(),
            url: None,
            model: default_model(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
            temperature: default_temperature(),
            max_context_tokens: default_max_context_tokens(),
            max_retries: default_max_retries(),
        }
    }
}

impl OracleConfig {
    /// Oracle configuration for a local Ollama server
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            mode: OracleMode::Ollama,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Oracle configuration for the OpenAI API
    pub fn open_ai(model: impl Into<String>) -> Self {
        Self {
            mode: OracleMode::OpenAi,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the backend URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The endpoint to call, without a trailing slash
    pub fn endpoint(&self) -> &str {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.mode.default_url())
            .trim_end_matches('/')
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the credential
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set retries for transient failures
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// The configured credential, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Fill a missing credential from `OPENAI_API_KEY`
    pub fn with_env_credentials(mut self) -> Self {
        if self.api_key().is_none() && self.mode.requires_api_key() {
            if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
                self.api_key = Some(key);
            }
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("oracle.model", "must not be empty"));
        }
        if self.mode.requires_api_key() && self.api_key().is_none() {
            return Err(ConfigError::invalid(
                "oracle.api_key",
                "required for OpenAI-compatible backends",
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "oracle.temperature",
                format!("{} is outside 0.0..=2.0", self.temperature),
            ));
        }
        Ok(())
    }
}

/// Oracle settings for a single stage
///
/// Unset fields fall back to the `oracle` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, alias = "openai_api_key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl StageOverride {
    fn apply(&self, mut oracle: OracleConfig) -> OracleConfig {
        if let Some(model) = &self.model {
            oracle.model = model.clone();
        }
        if let Some(api_key) = &self.api_key {
            oracle.api_key = Some(api_key.clone());
        }
        if let Some(url) = &self.url {
            oracle.url = Some(url.clone());
        }
        oracle
    }
}

/// Configuration for a solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum refinement calls after the initial generation
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Oracle used for every stage unless a stage section overrides it
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Overrides for schema pruning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<StageOverride>,

    /// Overrides for initial generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decomposer: Option<StageOverride>,

    /// Overrides for refinement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner: Option<StageOverride>,

    /// Log full prompts and raw oracle responses at debug level
    #[serde(default)]
    pub verbose: bool,
}

/// Configuration section holding a stage's overrides
fn section_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Prune => "selector",
        Stage::Generate => "decomposer",
        Stage::Refine => "refiner",
    }
}

fn default_max_iterations() -> usize {
    3
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            oracle: OracleConfig::default(),
            selector: None,
            decomposer: None,
            refiner: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Create a solver configuration around an oracle configuration
    pub fn new(oracle: OracleConfig) -> Self {
        Self {
            oracle,
            ..Default::default()
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Set the refinement budget
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Enable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Use one model for every stage, replacing stage-level models
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.oracle.model = model.into();
        for stage in [&mut self.selector, &mut self.decomposer, &mut self.refiner]
            .into_iter()
            .flatten()
        {
            stage.model = None;
        }
        self
    }

    /// Set the overrides for one stage
    pub fn with_stage(mut self, stage: Stage, overrides: StageOverride) -> Self {
        let slot = match stage {
            Stage::Prune => &mut self.selector,
            Stage::Generate => &mut self.decomposer,
            Stage::Refine => &mut self.refiner,
        };
        *slot = Some(overrides);
        self
    }

    /// The overrides configured for `stage`, if any
    pub fn stage_override(&self, stage: Stage) -> Option<&StageOverride> {
        match stage {
            Stage::Prune => self.selector.as_ref(),
            Stage::Generate => self.decomposer.as_ref(),
            Stage::Refine => self.refiner.as_ref(),
        }
    }

    /// The effective oracle configuration for `stage`
    pub fn oracle_for(&self, stage: Stage) -> OracleConfig {
        match self.stage_override(stage) {
            Some(overrides) => overrides.apply(self.oracle.clone()),
            None => self.oracle.clone(),
        }
    }

    /// Validate the effective oracle of every stage
    pub fn validate(&self) -> ConfigResult<()> {
        for stage in [Stage::Prune, Stage::Generate, Stage::Refine] {
            self.oracle_for(stage).validate().map_err(|err| match err {
                ConfigError::InvalidValue { field, message }
                    if self.stage_override(stage).is_some() =>
                {
                    ConfigError::InvalidValue {
                        field: field.replacen("oracle", section_name(stage), 1),
                        message,
                    }
                }
                other => other,
            })?;
        }
        Ok(())
    }
}
