//! TOML Configuration File Support
//!
//! Configuration loading for the chat client, supporting a TOML file at
//! `~/.config/streamchat/client.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [service]
//! base_url = "http://localhost:8000/api"
//! connect_timeout_ms = 5000
//! request_timeout_ms = 120000
//! stream_idle_timeout_ms = 60000
//!
//! [chat]
//! streaming = true
//! error_message = "Sorry, I encountered an error. Please try again."
//! ```
//!
//! # Environment Variables
//!
//! - `STREAMCHAT_BASE_URL`: chat service base URL
//! - `STREAMCHAT_CONNECT_TIMEOUT`: connect timeout in milliseconds
//! - `STREAMCHAT_REQUEST_TIMEOUT`: request timeout in milliseconds
//! - `STREAMCHAT_STREAM_IDLE_TIMEOUT`: longest wait for the next reply chunk in milliseconds
//! - `STREAMCHAT_STREAMING`: `0`/`false` to request complete replies

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::ERROR_MESSAGE;

/// Default chat service base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Service section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceToml {
    /// Chat service base URL
    pub base_url: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Timeout for non-streamed requests in milliseconds
    pub request_timeout_ms: Option<u64>,

    /// Longest silence between reply chunks in milliseconds
    pub stream_idle_timeout_ms: Option<u64>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Whether replies are streamed
    pub streaming: Option<bool>,

    /// Message shown in place of a failed reply
    pub error_message: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Service configuration section
    pub service: ServiceToml,

    /// Chat behaviour section
    pub chat: ChatToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Chat client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Chat service base URL
    pub base_url: String,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Timeout for session creation and complete replies in milliseconds
    pub request_timeout_ms: u64,

    /// Longest wait for the next chunk of a streamed reply in milliseconds
    ///
    /// Streamed replies have no overall deadline; a stream that stays silent
    /// this long fails the turn.
    pub stream_idle_timeout_ms: u64,

    /// Stream replies (`false` fetches complete replies)
    pub streaming: bool,

    /// Message that replaces a failed assistant reply
    pub error_message: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 120_000,
            stream_idle_timeout_ms: 60_000,
            streaming: true,
            error_message: ERROR_MESSAGE.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty or non-HTTP base
    /// URL, a zero timeout, or an empty error message.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url must not be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "base_url must be an http(s) URL, got {url}"
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.stream_idle_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "stream_idle_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.error_message.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "error_message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/streamchat/client.toml` or
/// `~/.config/streamchat/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("streamchat").join("client.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());
    config.base_url = normalize_base_url(&config.base_url);

    Ok(config)
}

/// Strip trailing slashes so endpoint paths can be appended directly
fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    if let Some(ref url) = toml.service.base_url {
        config.base_url = url.clone();
    }
    if let Some(timeout) = toml.service.connect_timeout_ms {
        config.connect_timeout_ms = timeout;
    }
    if let Some(timeout) = toml.service.request_timeout_ms {
        config.request_timeout_ms = timeout;
    }
    if let Some(timeout) = toml.service.stream_idle_timeout_ms {
        config.stream_idle_timeout_ms = timeout;
    }

    if let Some(streaming) = toml.chat.streaming {
        config.streaming = streaming;
    }
    if let Some(ref message) = toml.chat.error_message {
        config.error_message = message.clone();
    }
}

/// Apply environment variable overrides to the config
///
/// `lookup` resolves a variable name; production passes `std::env::var`.
fn apply_env_config<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("STREAMCHAT_BASE_URL") {
        config.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("STREAMCHAT_CONNECT_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.connect_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(timeout) = lookup("STREAMCHAT_REQUEST_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.request_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(timeout) = lookup("STREAMCHAT_STREAM_IDLE_TIMEOUT") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.stream_idle_timeout_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(streaming) = lookup("STREAMCHAT_STREAMING") {
        config.streaming = streaming != "0" && streaming.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Command-line overrides applied on top of file and environment values
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,
    /// Streaming override
    pub streaming: Option<bool>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override streaming mode
    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Apply the overrides to a loaded configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(ref url) = self.base_url {
            config.base_url = normalize_base_url(url);
            config.source = ConfigSource::Cli;
        }
        if let Some(streaming) = self.streaming {
            config.streaming = streaming;
            config.source = ConfigSource::Cli;
        }
    }
}
