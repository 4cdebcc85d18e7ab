use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SonderaError};

/// Top-level Sondera configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub research: ResearchConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub models: ModelRoles,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Research loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Number of search queries generated for the first dispatch.
    #[serde(default = "default_initial_queries")]
    pub initial_search_query_count: u32,
    /// Hard bound on reflection iterations.
    #[serde(default = "default_max_loops")]
    pub max_research_loops: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            initial_search_query_count: default_initial_queries(),
            max_research_loops: default_max_loops(),
        }
    }
}

fn default_initial_queries() -> u32 { 3 }
fn default_max_loops() -> u32 { 2 }

/// Provider-level model settings shared by all stage roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl ModelConfig {
    /// The same provider settings with a different model id.
    pub fn for_model(&self, model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            ..self.clone()
        }
    }

    /// The same settings with a different sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

fn default_provider() -> String { "gemini".to_string() }
fn default_max_tokens() -> u32 { 8192 }
fn default_temperature() -> f32 { 0.0 }

/// Which model id serves each stage role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRoles {
    #[serde(default = "default_query_model")]
    pub query_generator: String,
    #[serde(default = "default_reflection_model")]
    pub reflection: String,
    #[serde(default = "default_answer_model")]
    pub answer: String,
}

impl Default for ModelRoles {
    fn default() -> Self {
        Self {
            query_generator: default_query_model(),
            reflection: default_reflection_model(),
            answer: default_answer_model(),
        }
    }
}

fn default_query_model() -> String { "gemini-2.0-flash".to_string() }
fn default_reflection_model() -> String { "gemini-2.5-flash".to_string() }
fn default_answer_model() -> String { "gemini-2.5-pro".to_string() }

/// Retry configuration for backend requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 2 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Where the system preamble lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_path")]
    pub path: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: default_policy_path(),
        }
    }
}

fn default_policy_path() -> String { "policy.json".to_string() }

/// Per-run overrides supplied by the caller. Set once at entry;
/// they take precedence over the config defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOverrides {
    #[serde(default)]
    pub initial_search_query_count: Option<u32>,
    #[serde(default)]
    pub max_research_loops: Option<u32>,
    #[serde(default)]
    pub reasoning_model: Option<String>,
    #[serde(default)]
    pub query_generator_model: Option<String>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| SonderaError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| SonderaError::Config(e.to_string()))
    }

    /// Effective query count for a run.
    pub fn initial_query_count(&self, overrides: &RunOverrides) -> u32 {
        overrides
            .initial_search_query_count
            .unwrap_or(self.research.initial_search_query_count)
            .max(1)
    }

    /// Effective loop bound for a run.
    pub fn max_research_loops(&self, overrides: &RunOverrides) -> u32 {
        overrides
            .max_research_loops
            .unwrap_or(self.research.max_research_loops)
    }

    /// Model config for the query-generation stage.
    pub fn query_generator_model(&self, overrides: &RunOverrides) -> ModelConfig {
        let id = overrides
            .query_generator_model
            .as_deref()
            .unwrap_or(&self.models.query_generator);
        self.model.for_model(id)
    }

    /// Model config for the reflection stage.
    pub fn reflection_model(&self, overrides: &RunOverrides) -> ModelConfig {
        let id = overrides
            .reasoning_model
            .as_deref()
            .unwrap_or(&self.models.reflection);
        self.model.for_model(id)
    }

    /// Model config for planner, actor, self-check, and final answer.
    pub fn answer_model(&self, overrides: &RunOverrides) -> ModelConfig {
        let id = overrides
            .reasoning_model
            .as_deref()
            .unwrap_or(&self.models.answer);
        self.model.for_model(id)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
