use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{OptimizerError, Result};
use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;

/// Desktop browser identity sent with page requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Global asinopt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Marketplace base URL product pages are fetched from
    #[serde(default = "default_marketplace_url")]
    pub marketplace_url: String,

    /// Page fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Continue with synthetic product data when scraping fails
    #[serde(default)]
    pub degraded_mode: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub model: ModelConfig,
}

/// Generative model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Generative Language API base URL
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,

    /// Without a key every listing comes from the synthetic template
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model call timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

fn default_marketplace_url() -> String {
    "https://www.amazon.com".to_string()
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_model_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marketplace_url: default_marketplace_url(),
            fetch_timeout_secs: default_fetch_timeout(),
            degraded_mode: false,
            user_agent: default_user_agent(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            endpoint: default_model_endpoint(),
            api_key: None,
            timeout_secs: default_model_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `GEMINI_API_KEY` and `ASINOPT_DEGRADED` on top of the file settings
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.model.api_key = Some(key);
        }
        if let Some(flag) = lookup("ASINOPT_DEGRADED") {
            self.degraded_mode = matches!(flag.trim(), "1" | "true" | "yes");
        }
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "asinopt")
            .ok_or_else(|| OptimizerError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "asinopt")
            .ok_or_else(|| OptimizerError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports ASINOPT_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("ASINOPT_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("asinopt.db"))
    }
}
