// config.rs — Tracker layout and enrichment job configuration.
//
// TrackerConfig determines where state lives. The `for_project()`
// constructor generates the standard `.ct/` layout under a project root:
//
//   .ct/goals/       one JSON file per goal
//   .ct/enrich.toml  generator, retry, and run budget settings
//
// Every field in enrich.toml has a serde default, so an empty or partial
// file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// File-system layout for a tracker project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Root directory of the project.
    pub project_root: PathBuf,

    /// Directory for the goal store (one JSON file per goal).
    pub goals_dir: PathBuf,

    /// Path to the enrichment job config.
    pub enrich_config: PathBuf,
}

impl TrackerConfig {
    /// Create a config with the standard `.ct/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let ct_dir = root.join(".ct");
        Self {
            project_root: root,
            goals_dir: ct_dir.join("goals"),
            enrich_config: ct_dir.join("enrich.toml"),
        }
    }
}

/// Top-level enrichment configuration from .ct/enrich.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Language-model endpoint settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Backoff for transient generation failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Wall-clock budget for a run. When exceeded, no new records are
    /// started and the partial summary is returned.
    #[serde(default)]
    pub run_budget_secs: Option<u64>,
}

/// Wire format spoken by the HTTP generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    /// Anthropic Messages API (`content[0].text`).
    #[default]
    #[serde(rename = "anthropic_messages")]
    AnthropicMessages,
    /// OpenAI-compatible chat completions (`choices[0].message.content`).
    #[serde(rename = "openai_chat")]
    OpenAiChat,
}

/// Language-model endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Full URL of the completion endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Output bound passed to the model on every call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request-level timeout; expiry counts as a transient failure
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variable holding the API key. No key, no auth header.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,

    /// Value of the `anthropic-version` header (Anthropic provider only)
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            anthropic_version: default_anthropic_version(),
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration for transient generation failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per record, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

// Serde default functions
fn default_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_max_tokens() -> u32 {
    200
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_key_env() -> Option<String> {
    Some("ANTHROPIC_API_KEY".to_string())
}

fn default_anthropic_version() -> Option<String> {
    Some("2023-06-01".to_string())
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl EnrichConfig {
    /// Load enrichment config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config, returning defaults only if the file doesn't exist.
    /// A file that exists but is malformed is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no enrich config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Reject values the job cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.generator.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "generator.max_tokens must be at least 1".to_string(),
            ));
        }
        if self.generator.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generator.endpoint must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn run_budget(&self) -> Option<Duration> {
        self.run_budget_secs.map(Duration::from_secs)
    }
}
