use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured endpoint
pub const ENDPOINT_ENV: &str = "RAGCHAT_ENDPOINT";

/// How the `messages` field is encoded in the request body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormEncoding {
    /// multipart/form-data, as a browser FormData body
    #[default]
    Multipart,
    /// application/x-www-form-urlencoded
    Urlencoded,
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the answer service
    pub endpoint: String,

    /// Path of the chat route on the answer service
    pub path: String,

    /// Request body encoding
    pub encoding: FormEncoding,

    /// Client-side request timeout; unset means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    /// Shown in the history pane before the first message
    pub greeting: String,
    /// Shown in the empty composer
    pub placeholder: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: "http://localhost:3000".to_string(),
            path: "/api/chat".to_string(),
            encoding: FormEncoding::default(),
            request_timeout_secs: None,
            ui: UiConfig::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            title: "RAG Chat Demo".to_string(),
            greeting: "Ask me anything about my resume...".to_string(),
            placeholder: "Type your message...".to_string(),
        }
    }
}

impl Config {
    /// Directory holding the config file and the log
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".ragchat"))
    }

    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            tracing::info!(path = %config_path.display(), "config file not found, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        tracing::info!(path = %config_path.display(), "loaded config");
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply endpoint overrides. The command line wins over the environment.
    pub fn apply_overrides(&mut self, env_endpoint: Option<String>, cli_endpoint: Option<String>) {
        if let Some(endpoint) = cli_endpoint.or(env_endpoint).filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
    }

    /// Full URL of the chat route
    pub fn answer_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }

    /// Render as TOML for display
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
