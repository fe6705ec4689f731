use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model id sent to the API
    pub model: String,

    /// API root, without a trailing slash
    pub base_url: String,

    /// Inline API key; takes precedence over the environment
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Optional system instruction sent with every request
    pub system_instruction: Option<String>,

    pub temperature: Option<f32>,

    pub max_output_tokens: Option<u32>,

    /// Connect timeout for the HTTP client, in seconds
    pub connect_timeout_secs: u64,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
            connect_timeout_secs: 10,
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Directory holding the config and log files
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".gemchat"))
    }

    /// Load configuration from the given path, or from the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::home_dir()?.join("config.toml"),
        };
        Self::load_from(&config_path)
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    /// Get API key from config or environment
    pub fn get_api_key(&self) -> Option<String> {
        non_blank(self.api_key.clone())
            .or_else(|| non_blank(std::env::var(&self.api_key_env).ok()))
    }

    /// Apply command-line overrides
    pub fn with_model_override(mut self, model: Option<String>) -> Self {
        if let Some(model) = model {
            self.model = model;
        }
        self
    }
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.filter(|key| !key.trim().is_empty())
}
