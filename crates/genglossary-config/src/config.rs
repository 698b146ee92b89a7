//! Layered application configuration.
//!
//! The main entry point is [`AppConfig`], assembled by [`load_config`] from
//! (lowest to highest priority):
//!
//! 1. Built-in defaults
//! 2. `~/.genglossary/config.yaml`
//! 3. `GENGLOSSARY_*` environment variables
//!
//! CLI flag overrides are applied afterwards by callers via
//! [`AppConfig::with_overrides`], since clap parsing lives above this crate.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use genglossary_core::enums::LlmProvider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration layers could not be merged or deserialized.
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),

    /// The data directory could not be determined (no override, no home dir).
    #[error("could not determine the genglossary data directory (set GENGLOSSARY_DATA_DIR)")]
    DataDirNotFound,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Defaults for a pipeline run's LLM adapter, overridable per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmDefaults {
    /// Which adapter to speak: `ollama` or `openai-compatible`.
    #[serde(default = "default_llm_provider")]
    pub provider: LlmProvider,

    /// Model identifier passed to the adapter.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Base URL of the LLM server.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmDefaults {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> LlmProvider {
    LlmProvider::Ollama
}

fn default_llm_model() -> String {
    "llama3".to_string()
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    120
}

/// The full genglossary configuration, corresponding to
/// `~/.genglossary/config.yaml` layered with environment overrides.
///
/// All fields use `serde` defaults so a partially-specified YAML file
/// deserializes correctly with sensible values for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data directory override. Normally left unset and resolved via
    /// [`crate::data_dir::resolve_data_dir`]; present here so it can also be
    /// set from `config.yaml` rather than only the environment.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Default LLM adapter settings for newly created projects.
    #[serde(default)]
    pub llm: LlmDefaults,

    /// Actor identity override (falls back to git/user detection when unset).
    #[serde(default)]
    pub actor: Option<String>,

    /// Log verbosity passed to `tracing_subscriber`'s env-filter, e.g. `info`
    /// or `genglossary_pipeline=debug,info`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output JSON instead of human-readable text from the CLI.
    #[serde(default)]
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            llm: LlmDefaults::default(),
            actor: None,
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Overrides collected from CLI flags, applied last and unconditionally
/// when `Some`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<String>,
    pub actor: Option<String>,
    pub log_level: Option<String>,
    pub json: Option<bool>,
}

impl AppConfig {
    /// Applies CLI-flag overrides on top of the layered file/env config.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(data_dir) = overrides.data_dir {
            self.data_dir = Some(data_dir);
        }
        if let Some(actor) = overrides.actor {
            self.actor = Some(actor);
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if let Some(json) = overrides.json {
            self.json = json;
        }
        self
    }
}

/// Loads configuration by merging, in increasing priority:
/// defaults, `config_path` (if it exists), then `GENGLOSSARY_*` env vars.
///
/// Never errors on a missing `config_path` -- an absent file simply
/// contributes no overrides.
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

    if config_path.exists() {
        figment = figment.merge(Yaml::file(config_path));
    }

    figment = figment.merge(Env::prefixed("GENGLOSSARY_").split("__"));

    let config: AppConfig = figment.extract()?;
    Ok(config)
}

/// Writes `config` as YAML to `config_path`, creating parent directories
/// as needed.
pub fn save_config(config_path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::InvalidValue {
            key: "config_path".to_string(),
            reason: e.to_string(),
        })?;
    }
    let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::InvalidValue {
        key: "<config>".to_string(),
        reason: e.to_string(),
    })?;
    std::fs::write(config_path, yaml).map_err(|e| ConfigError::InvalidValue {
        key: "config_path".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert!(cfg.data_dir.is_none());
        assert_eq!(cfg.llm.provider, LlmProvider::Ollama);
        assert_eq!(cfg.llm.model, "llama3");
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.json);
    }

    #[test]
    fn test_load_missing_config_returns_defaults() {
        let path = Path::new("/nonexistent/path/config.yaml");
        let cfg = load_config(path).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_roundtrip_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");

        let mut cfg = AppConfig::default();
        cfg.llm.model = "mixtral".to_string();
        cfg.json = true;

        save_config(&config_path, &cfg).unwrap();
        let loaded = load_config(&config_path).unwrap();

        assert_eq!(loaded.llm.model, "mixtral");
        assert!(loaded.json);
    }

    #[test]
    fn test_partial_yaml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "json: true\n").unwrap();

        let cfg = load_config(&config_path).unwrap();
        assert!(cfg.json);
        assert_eq!(cfg.llm.model, "llama3");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "log_level: info\n").unwrap();

        std::env::set_var("GENGLOSSARY_LOG_LEVEL", "debug");
        let cfg = load_config(&config_path).unwrap();
        std::env::remove_var("GENGLOSSARY_LOG_LEVEL");

        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides_win_over_everything() {
        let cfg = AppConfig::default().with_overrides(ConfigOverrides {
            data_dir: Some("/tmp/override".to_string()),
            actor: None,
            log_level: Some("trace".to_string()),
            json: None,
        });
        assert_eq!(cfg.data_dir.as_deref(), Some("/tmp/override"));
        assert_eq!(cfg.log_level, "trace");
        assert!(!cfg.json);
    }
}
