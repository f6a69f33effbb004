//! Application configuration for cvtailor.
//!
//! User config lives at `~/.cvtailor/cvtailor.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{Result, TailorError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cvtailor.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cvtailor";

// ---------------------------------------------------------------------------
// Config structs (matching cvtailor.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Retry and feedback budgets for the pipeline.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Chat-completions endpoint settings.
    #[serde(default)]
    pub llm: LlmSection,

    /// Job posting retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalSection,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Attempts allowed for the parse and analyze stages.
    #[serde(default = "default_budget")]
    pub max_stage_attempts: u32,

    /// Generate → review → audit cycles before giving up.
    #[serde(default = "default_budget")]
    pub max_write_attempts: u32,

    /// Reviewer passes per write cycle.
    #[serde(default = "default_budget")]
    pub max_review_iterations: u32,

    /// Pause between parse/analyze retries. Zero retries immediately.
    #[serde(default)]
    pub retry_delay_ms: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_stage_attempts: default_budget(),
            max_write_attempts: default_budget(),
            max_review_iterations: default_budget(),
            retry_delay_ms: 0,
        }
    }
}

fn default_budget() -> u32 {
    3
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    /// Base URL of an OpenAI-compatible API (OpenRouter, Ollama `/v1`, ...).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for every role.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Re-asks when the model's output does not parse.
    #[serde(default = "default_budget")]
    pub output_retries: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            output_retries: default_budget(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-oss-20b".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_request_timeout() -> u64 {
    120
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    /// HTTP timeout in seconds.
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,

    /// Characters of retrieved content passed on to the analyzer.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_retrieval_timeout(),
            max_chars: default_max_chars(),
        }
    }
}

fn default_retrieval_timeout() -> u64 {
    30
}
fn default_max_chars() -> usize {
    20_000
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_stage_attempts: u32,
    pub max_write_attempts: u32,
    pub max_review_iterations: u32,
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_stage_attempts: config.pipeline.max_stage_attempts,
            max_write_attempts: config.pipeline.max_write_attempts,
            max_review_iterations: config.pipeline.max_review_iterations,
            retry_delay: Duration::from_millis(config.pipeline.retry_delay_ms),
        }
    }
}

impl PipelineConfig {
    /// Reject zero budgets; every loop must run at least once.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_stage_attempts", self.max_stage_attempts),
            ("max_write_attempts", self.max_write_attempts),
            ("max_review_iterations", self.max_review_iterations),
        ] {
            if value == 0 {
                return Err(TailorError::config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

/// Runtime chat-completions settings, with the API key resolved from the environment.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub output_retries: u32,
}

impl From<&AppConfig> for LlmConfig {
    fn from(config: &AppConfig) -> Self {
        let api_key = std::env::var(&config.llm.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        Self {
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            request_timeout: Duration::from_secs(config.llm.request_timeout_secs),
            output_retries: config.llm.output_retries,
        }
    }
}

/// Runtime retrieval settings.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub timeout: Duration,
    pub max_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetrievalConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.retrieval.timeout_secs),
            max_chars: config.retrieval.max_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cvtailor/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| TailorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cvtailor/cvtailor.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TailorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TailorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TailorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TailorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TailorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty.
///
/// Loopback endpoints (a local Ollama, for instance) need no key.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    if is_loopback_endpoint(&config.llm.base_url) {
        return Ok(());
    }

    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(TailorError::config(format!(
            "API key not found for {}. Set the {var_name} environment variable.",
            config.llm.base_url
        ))),
    }
}

fn is_loopback_endpoint(base_url: &str) -> bool {
    let Ok(url) = Url::parse(base_url) else {
        return false;
    };
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
