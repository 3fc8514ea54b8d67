use chat::metrics::DEFAULT_ROUND_MS;
use proto::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat server endpoint and model.
    #[serde(default)]
    pub server: ServerConfig,

    /// Input history file.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Throughput meter tuning.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the chat server; `/api/chat` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name sent with every request.
    #[serde(default)]
    pub model: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// History file location. A leading `~/` expands to `$HOME`.
    #[serde(default = "default_history_path")]
    pub path: String,
    /// Capacity of the buffer; 0 keeps no history at all.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Append each submitted line to the file.
    #[serde(default = "default_true")]
    pub persist: bool,
}

fn default_history_path() -> String {
    "~/.termchat/history".to_string()
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            max_entries: default_max_entries(),
            persist: true,
        }
    }
}

impl HistoryConfig {
    /// The history file path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match self.path.strip_prefix("~/") {
            Some(rest) => {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(rest)
            }
            None => PathBuf::from(&self.path),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Bucket interval in milliseconds; 0 disables truncation.
    #[serde(default = "default_round_ms")]
    pub round_ms: i64,
}

fn default_round_ms() -> i64 {
    DEFAULT_ROUND_MS
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            round_ms: default_round_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            let cwd = std::env::current_dir().ok()?.join("config.toml");
            if cwd.exists() {
                return Some(cwd);
            }
            let home = std::env::var("HOME").ok()?;
            let home_config = PathBuf::from(home).join(".termchat").join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var("TERMCHAT_BASE_URL") {
            config.server.base_url = url;
        }
        if let Ok(model) = std::env::var("TERMCHAT_MODEL") {
            config.server.model = model;
        }
        if let Ok(history) = std::env::var("TERMCHAT_HISTORY") {
            config.history.path = history;
        }

        debug!(
            base_url = %config.server.base_url,
            model = %config.server.model,
            history = %config.history.path,
            "Config loaded"
        );
        Ok(config)
    }

    /// Applies command-line overrides, which win over file and env values.
    pub fn apply_overrides(&mut self, base_url: Option<String>, model: Option<String>) {
        if let Some(url) = base_url {
            self.server.base_url = url;
        }
        if let Some(model) = model {
            self.server.model = model;
        }
    }

    /// Checks the fields a session cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.model.trim().is_empty() {
            return Err(ConfigError::MissingField("server.model".to_string()));
        }
        let url = self.server.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "server.base_url".to_string(),
                reason: format!("expected an http(s) URL, got {url:?}"),
            });
        }
        Ok(())
    }
}
