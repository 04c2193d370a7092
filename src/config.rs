//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::{HttpBackendConfig, SessionFile};
use crate::session::SessionConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted backend connection
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,

    /// Public anon key
    #[serde(default)]
    pub anon_key: String,

    #[serde(default = "default_backend_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Where the current session is persisted
    pub session_file: Option<String>,
}

fn default_backend_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            request_timeout_ms: default_backend_timeout(),
            max_retries: default_max_retries(),
            session_file: None,
        }
    }
}

/// Session manager settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Upper bound on each identity call
    #[serde(default = "default_session_timeout")]
    pub request_timeout_secs: u64,
}

fn default_session_timeout() -> u64 {
    10
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_session_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, most specific first
    pub fn default_paths() -> Vec<PathBuf> {
        [
            Some(PathBuf::from("./futurecal.toml")),
            dirs::config_dir().map(|p| p.join("futurecal").join("config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Backend overrides
        if let Some(url) = var("FUTURECAL_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(key) = var("FUTURECAL_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(path) = var("FUTURECAL_SESSION_FILE") {
            self.backend.session_file = Some(path);
        }

        // Logging overrides
        if let Some(level) = var("FUTURECAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FUTURECAL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check that the backend can be reached with this config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "backend.url",
                env: "FUTURECAL_BACKEND_URL",
            });
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "backend.anon_key",
                env: "FUTURECAL_ANON_KEY",
            });
        }
        Ok(())
    }

    /// Settings for [`HttpBackend`](crate::backend::HttpBackend)
    pub fn backend_config(&self) -> Result<HttpBackendConfig, ConfigError> {
        self.validate()?;
        let session_file = self
            .backend
            .session_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(SessionFile::default_path);
        Ok(HttpBackendConfig {
            base_url: self.backend.url.trim().to_string(),
            anon_key: self.backend.anon_key.trim().to_string(),
            request_timeout_ms: self.backend.request_timeout_ms,
            max_retries: self.backend.max_retries,
            session_file: Some(session_file),
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: Duration::from_secs(self.session.request_timeout_secs.max(1)),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Missing {field}; set it in the config file or via {env}")]
    Missing {
        field: &'static str,
        env: &'static str,
    },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# FutureCal Configuration
#
# Environment variables override these settings:
# - FUTURECAL_BACKEND_URL
# - FUTURECAL_ANON_KEY
# - FUTURECAL_SESSION_FILE
# - FUTURECAL_LOG_LEVEL
# - FUTURECAL_LOG_FORMAT

[backend]
# Hosted project URL
url = "https://your-project.supabase.co"

# Public anon key from the project settings
anon_key = ""

# Per-request timeout (ms)
request_timeout_ms = 10000

# Attempts for transient failures (connect errors, timeouts, 429)
max_retries = 3

# Where the signed-in session is kept between runs
# session_file = "~/.local/share/futurecal/session.json"

[session]
# Upper bound on each sign-in / sign-out / session call (seconds)
request_timeout_secs = 10

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
