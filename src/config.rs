//! # Configuration Management
//!
//! Centralized configuration for the relay transport.
//!
//! This module provides structured configuration for the transport (size
//! limits, rate limiting, connection timeouts) and for logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()` (`RPC_RELAY_*`)
//!
//! ## Security Considerations
//! - The 5 MiB message ceiling bounds memory per inbound line
//! - 60 messages per rolling minute bounds work per connection
//! - The connection timeout governs both queue retention and health-check staleness

use crate::error::{Result, TransportError};
use crate::utils::rate_limiter::RefillPolicy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Max allowed inbound or outbound message size (5 MiB)
pub const MAX_MESSAGE_SIZE: usize = 5 * 1024 * 1024;

/// Accepted messages per rate-limit window
pub const RATE_LIMIT_CAPACITY: u32 = 60;

/// Rate-limit window
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_millis(60_000);

/// Queue retention and health-check staleness threshold
pub const CONNECTION_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Health-check polling interval
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(5_000);

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RelayConfig {
    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| TransportError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| TransportError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| TransportError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `RPC_RELAY_*` overrides using `lookup` to read variables.
    ///
    /// Unparseable values are reported rather than silently ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse::<T>().map_err(|_| {
                TransportError::ConfigError(format!("Invalid value for {key}: '{value}'"))
            })
        }

        if let Some(v) = lookup("RPC_RELAY_MAX_MESSAGE_SIZE") {
            self.transport.max_message_size = parse("RPC_RELAY_MAX_MESSAGE_SIZE", &v)?;
        }

        if let Some(v) = lookup("RPC_RELAY_RATE_LIMIT_CAPACITY") {
            self.transport.rate_limit.capacity = parse("RPC_RELAY_RATE_LIMIT_CAPACITY", &v)?;
        }

        if let Some(v) = lookup("RPC_RELAY_RATE_LIMIT_WINDOW_MS") {
            self.transport.rate_limit.window =
                Duration::from_millis(parse("RPC_RELAY_RATE_LIMIT_WINDOW_MS", &v)?);
        }

        if let Some(v) = lookup("RPC_RELAY_CONNECTION_TIMEOUT_MS") {
            self.transport.connection_timeout =
                Duration::from_millis(parse("RPC_RELAY_CONNECTION_TIMEOUT_MS", &v)?);
        }

        if let Some(v) = lookup("RPC_RELAY_HEALTH_CHECK_INTERVAL_MS") {
            self.transport.health_check_interval =
                Duration::from_millis(parse("RPC_RELAY_HEALTH_CHECK_INTERVAL_MS", &v)?);
        }

        if let Some(v) = lookup("RPC_RELAY_LOG_LEVEL") {
            self.logging.log_level = parse("RPC_RELAY_LOG_LEVEL", &v)?;
        }

        if let Some(v) = lookup("RPC_RELAY_LOG_JSON") {
            self.logging.json_format = parse("RPC_RELAY_LOG_JSON", &v)?;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TransportError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| TransportError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TransportError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Token-bucket settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum tokens (burst size)
    pub capacity: u32,

    /// Time to refill a full bucket
    #[serde(with = "duration_serde")]
    pub window: Duration,

    /// Refill strategy
    #[serde(default)]
    pub policy: RefillPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: RATE_LIMIT_CAPACITY,
            window: RATE_LIMIT_WINDOW,
            policy: RefillPolicy::Continuous,
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Maximum allowed message size in bytes, inbound and outbound
    pub max_message_size: usize,

    /// Inbound admission rate
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Queue retention window and health-check staleness threshold
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// How often the health check runs
    #[serde(with = "duration_serde")]
    pub health_check_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            rate_limit: RateLimitConfig::default(),
            connection_timeout: CONNECTION_TIMEOUT,
            health_check_interval: HEALTH_CHECK_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Validate max message size
        if self.max_message_size == 0 {
            errors.push("Max message size cannot be 0".to_string());
        } else if self.max_message_size < 1024 {
            errors.push("Max message size too small (minimum: 1 KB)".to_string());
        } else if self.max_message_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "Max message size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_message_size
            ));
        }

        // Validate rate limit
        if self.rate_limit.capacity == 0 {
            errors.push("Rate limit capacity must be greater than 0".to_string());
        }

        if self.rate_limit.window.as_millis() < 1 {
            errors.push("Rate limit window too short (minimum: 1ms)".to_string());
        }

        // Validate timeouts
        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        }

        if self.health_check_interval.as_millis() < 10 {
            errors.push("Health check interval too short (minimum: 10ms)".to_string());
        } else if self.health_check_interval >= self.connection_timeout {
            errors.push(format!(
                "Health check interval ({} ms) must be shorter than the connection timeout ({} ms)",
                self.health_check_interval.as_millis(),
                self.connection_timeout.as_millis()
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to the console (stderr; stdout carries protocol traffic)
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("rpc-relay"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        // Validate app name
        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        // Validate file logging configuration
        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        // Validate at least one output is enabled
        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
