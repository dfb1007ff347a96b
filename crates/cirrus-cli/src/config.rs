//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Backend address used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Configuration for cirrus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL (the part before `/chat`)
    pub base_url: Option<String>,
    /// Abort a reply that streams for longer than this many seconds
    pub max_session_secs: Option<u64>,
    /// Whether to print agent status lines
    pub show_agents: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cirrus")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CIRRUS_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), "Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), "Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            max_session_secs: None,
            show_agents: Some(true),
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// Pick the backend URL: flag, then `CIRRUS_API_URL`, then file, then default
    pub fn base_url(&self, flag: Option<&str>) -> String {
        self.base_url_with_env(flag, std::env::var("CIRRUS_API_URL").ok())
    }

    fn base_url_with_env(&self, flag: Option<&str>, env: Option<String>) -> String {
        flag.map(str::to_string)
            .or(env.filter(|v| !v.trim().is_empty()))
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# cirrus configuration file
# Place at ~/.config/cirrus/config.toml (Linux) or set CIRRUS_CONFIG_PATH

# Agent backend (CIRRUS_API_URL and --base-url take precedence)
base_url = "http://localhost:8000/api"

# Abort a reply that streams longer than this (optional)
# max_session_secs = 600

# Print agent status changes while a reply streams
show_agents = true
"#
}
