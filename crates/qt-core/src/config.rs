use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration loaded from `~/.quartet/config.toml`.
///
/// API keys are never stored here. The `llm` section only names the env var
/// to read; [`CredentialProvider`] resolves it at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl Config {
    /// Load config from `~/.quartet/config.toml`, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Semantic checks that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.general.validate()?;
        self.memory.validate()?;
        self.llm.validate()?;
        self.workflow.validate()?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quartet")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl GeneralConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !["text", "json"].contains(&self.log_format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "general.log_format '{}' must be 'text' or 'json'",
                self.log_format
            )));
        }
        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Memory document location. Relative paths resolve against the working
    /// directory.
    #[serde(default = "default_memory_path")]
    pub path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "memory.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_memory_path() -> String {
    "four_agent_memory.json".into()
}

/// Chat-completion settings shared by every agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// OpenAI-compatible endpoint root, without the `/v1/...` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "llm.max_tokens must be greater than 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature {} must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.api_key_env must name an environment variable".into(),
            ));
        }
        Ok(())
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.7
}
fn default_base_url() -> String {
    "https://api.openai.com".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// Message budgets for the agent phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Messages one agent may exchange in a pipeline or iterative phase.
    #[serde(default = "default_phase_message_limit")]
    pub phase_message_limit: usize,
    #[serde(default = "default_iterative_cycles")]
    pub iterative_cycles: usize,
    #[serde(default)]
    pub collaborative: CollaborativeBudgets,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            phase_message_limit: default_phase_message_limit(),
            iterative_cycles: default_iterative_cycles(),
            collaborative: CollaborativeBudgets::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phase_message_limit == 0 {
            return Err(ConfigError::Validation(
                "workflow.phase_message_limit must be greater than 0".into(),
            ));
        }
        if self.iterative_cycles == 0 || self.iterative_cycles > 10 {
            return Err(ConfigError::Validation(
                "workflow.iterative_cycles must be between 1 and 10".into(),
            ));
        }
        self.collaborative.validate()
    }
}

fn default_phase_message_limit() -> usize {
    6
}
fn default_iterative_cycles() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeBudgets {
    #[serde(default = "default_planning_budget")]
    pub planning: usize,
    #[serde(default = "default_execution_budget")]
    pub execution: usize,
    #[serde(default = "default_review_budget")]
    pub review: usize,
    #[serde(default = "default_summary_budget")]
    pub summary: usize,
}

impl Default for CollaborativeBudgets {
    fn default() -> Self {
        Self {
            planning: default_planning_budget(),
            execution: default_execution_budget(),
            review: default_review_budget(),
            summary: default_summary_budget(),
        }
    }
}

impl CollaborativeBudgets {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("planning", self.planning),
            ("execution", self.execution),
            ("review", self.review),
            ("summary", self.summary),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "workflow.collaborative.{name} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

fn default_planning_budget() -> usize {
    5
}
fn default_execution_budget() -> usize {
    10
}
fn default_review_budget() -> usize {
    10
}
fn default_summary_budget() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Resolves secrets from the environment at the point of use.
pub struct CredentialProvider;

impl CredentialProvider {
    /// Read a credential from a named env var. Empty values count as unset.
    pub fn from_env(var_name: &str) -> Option<String> {
        std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
    }

    /// API key for the configured LLM endpoint.
    pub fn llm_api_key(settings: &LlmSettings) -> Option<String> {
        Self::from_env(&settings.api_key_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_env_var_is_none() {
        assert!(CredentialProvider::from_env("QUARTET_TEST_SURELY_UNSET_VAR").is_none());
    }

    #[test]
    fn json_log_format_flag() {
        let mut general = GeneralConfig::default();
        assert!(!general.json_logs());
        general.log_format = "json".into();
        assert!(general.json_logs());
    }
}
