//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for htime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completion endpoint URL
    pub endpoint: Option<String>,
    /// Bearer token for the endpoint (alternative to HTIME_API_KEY)
    pub api_key: Option<String>,
    /// Name the assistant greets with
    pub agent_name: Option<String>,
    /// JSON file holding the profile configuration
    pub profile_file: Option<String>,
    /// Use canned replies instead of the endpoint
    pub offline: Option<bool>,
    /// Directory for persisted widget state
    pub state_dir: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("htime")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("HTIME_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
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
            endpoint: None,
            api_key: None,
            agent_name: Some("hTime Assistant".to_string()),
            profile_file: None,
            offline: Some(true),
            state_dir: None,
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    /// API key from config, falling back to HTIME_API_KEY
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("HTIME_API_KEY").ok())
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# htime configuration file
# Place at ~/.config/htime/config.toml (Linux/Mac) or %APPDATA%\htime\config.toml (Windows)

# Chat-completion endpoint; HTIME_CHAT_URL is used when unset, and canned
# replies when neither is set
# endpoint = "https://example.supabase.co/functions/v1/chat-completion"

# API key (optional - HTIME_API_KEY is used when unset)
# api_key = "..."

# Name the assistant introduces itself with
agent_name = "hTime Assistant"

# Profile configuration JSON (flags, interaction level, time slots)
# profile_file = "~/.config/htime/profile.json"

# Reply with canned messages instead of calling the endpoint
offline = true

# Where live session state is kept
# state_dir = "~/.config/htime/state"
"#
}
