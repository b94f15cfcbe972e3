//! Configuration management
//!
//! This module handles loading, validation, and management of the Subtrack
//! configuration. Configuration is stored in TOML format at
//! ~/.subtrack/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **server**: HTTP bind address
//! - **auth**: Session lifetime
//! - **llm**: Completion API endpoint, model, timeout
//! - **email**: Transactional email API settings
//! - **reminders**: Default reminder lead time
//!
//! API keys are never stored here. They are read from the environment
//! (`OPENAI_API_KEY`, `EMAIL_API_KEY`), see [`crate::secrets`].
//!
//! # Examples
//!
//! ```no_run
//! use subtrack_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! # Ok(())
//! # }
//! ```

use sdk::errors::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    pub core: CoreConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Session settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Completion API settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// Email API settings
    #[serde(default)]
    pub email: EmailConfig,

    /// Reminder settings
    #[serde(default)]
    pub reminders: RemindersConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in hours (1-720)
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
}

/// Completion API configuration (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL for the chat completions API
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Upper bound on a single completion call, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    // Note: API key read from OPENAI_API_KEY, not from config
}

/// Transactional email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Send real emails; when false, reminders are only logged
    #[serde(default)]
    pub enabled: bool,

    /// Base URL for the email API
    #[serde(default = "default_email_base_url")]
    pub base_url: String,

    /// Sender address
    #[serde(default = "default_from_address")]
    pub from_address: String,
    // Note: API key read from EMAIL_API_KEY, not from config
}

/// Reminder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Days before a trial ends to send a reminder, when a subscription
    /// doesn't set its own value (0-30)
    #[serde(default = "default_days_before")]
    pub default_days_before: u32,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.subtrack")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_session_ttl_hours() -> u32 {
    24
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f64 {
    0.2
}

fn default_email_base_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_from_address() -> String {
    "Subtrack <reminders@subtrack.local>".to_string()
}

fn default_days_before() -> u32 {
    3
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_email_base_url(),
            from_address: default_from_address(),
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            default_days_before: default_days_before(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.subtrack/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, AppError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, AppError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();

        // Serialize before processing so ~ stays unexpanded on disk
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.subtrack/config.toml)
    fn default_config_path() -> Result<PathBuf, AppError> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".subtrack").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            llm: LLMConfig::default(),
            email: EmailConfig::default(),
            reminders: RemindersConfig::default(),
        }
    }

    /// Path of the SQLite database inside the data directory
    pub fn db_path(&self) -> PathBuf {
        self.core.data_dir.join("subtrack.db")
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated fields and numeric ranges
    /// - Expands ~ in the data directory
    /// - Creates the data directory if it doesn't exist
    fn validate_and_process(&mut self) -> Result<(), AppError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                AppError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Check field values without touching the file system
    pub fn validate(&self) -> Result<(), AppError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.server.host.trim().is_empty() {
            return Err(AppError::Config("server.host must not be empty".to_string()));
        }

        if !(1..=720).contains(&self.auth.session_ttl_hours) {
            return Err(AppError::Config(
                "auth.session_ttl_hours must be between 1 and 720".to_string(),
            ));
        }

        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("llm.model must not be empty".to_string()));
        }
        if !(1..=300).contains(&self.llm.timeout_secs) {
            return Err(AppError::Config(
                "llm.timeout_secs must be between 1 and 300".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.email.enabled && !self.email.from_address.contains('@') {
            return Err(AppError::Config(
                "email.from_address must be an email address".to_string(),
            ));
        }

        if self.reminders.default_days_before > 30 {
            return Err(AppError::Config(
                "reminders.default_days_before must be between 0 and 30".to_string(),
            ));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, AppError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| AppError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| AppError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.session_ttl_hours, 24);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(!config.email.enabled);
        assert_eq!(config.reminders.default_days_before, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let mut config = Config::default_config();
        config.llm.timeout_secs = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.timeout_secs"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = Config::default_config();
        config.core.log_level = "verbose".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.base_url, deserialized.llm.base_url);
        assert_eq!(config.server.port, deserialized.server.port);
    }
}
