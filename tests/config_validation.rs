//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use rpc_relay::config::{RelayConfig, TransportConfig, HEALTH_CHECK_INTERVAL, MAX_MESSAGE_SIZE};
use rpc_relay::utils::RefillPolicy;
use rpc_relay::TransportError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::Level;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_validates() {
    let config = RelayConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
}

#[test]
fn test_defaults_match_documented_limits() {
    let config = TransportConfig::default();
    assert_eq!(config.max_message_size, 5 * 1024 * 1024);
    assert_eq!(config.rate_limit.capacity, 60);
    assert_eq!(config.rate_limit.window, Duration::from_millis(60_000));
    assert_eq!(config.rate_limit.policy, RefillPolicy::Continuous);
    assert_eq!(config.connection_timeout, Duration::from_millis(300_000));
    assert_eq!(config.health_check_interval, Duration::from_millis(5_000));
}

#[test]
fn test_zero_max_message_size() {
    let mut config = RelayConfig::default();
    config.transport.max_message_size = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Max message size cannot be 0")));
}

#[test]
fn test_tiny_max_message_size() {
    let mut config = RelayConfig::default();
    config.transport.max_message_size = 512;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Max message size too small")));
}

#[test]
fn test_excessive_max_message_size() {
    let mut config = RelayConfig::default();
    config.transport.max_message_size = 200 * 1024 * 1024;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Max message size too large")));
}

#[test]
fn test_zero_rate_limit_capacity() {
    let mut config = RelayConfig::default();
    config.transport.rate_limit.capacity = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Rate limit capacity must be greater than 0")));
}

#[test]
fn test_zero_rate_limit_window() {
    let mut config = RelayConfig::default();
    config.transport.rate_limit.window = Duration::ZERO;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Rate limit window too short")));
}

#[test]
fn test_short_connection_timeout() {
    let mut config = RelayConfig::default();
    config.transport.connection_timeout = Duration::from_millis(50);
    config.transport.health_check_interval = Duration::from_millis(20);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Connection timeout too short")));
}

#[test]
fn test_health_interval_not_shorter_than_timeout() {
    let mut config = RelayConfig::default();
    config.transport.health_check_interval = config.transport.connection_timeout;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("must be shorter than the connection timeout")));
}

#[test]
fn test_tiny_health_interval() {
    let mut config = RelayConfig::default();
    config.transport.health_check_interval = Duration::from_millis(1);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Health check interval too short")));
}

#[test]
fn test_empty_app_name() {
    let mut config = RelayConfig::default();
    config.logging.app_name = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_log_to_file_without_path() {
    let mut config = RelayConfig::default();
    config.logging.log_to_file = true;
    config.logging.log_file_path = None;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("log_file_path must be specified")));
}

#[test]
fn test_no_logging_output() {
    let mut config = RelayConfig::default();
    config.logging.log_to_console = false;
    config.logging.log_to_file = false;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_multiple_errors_reported() {
    let mut config = RelayConfig::default();
    config.transport.max_message_size = 0;
    config.transport.rate_limit.capacity = 0;
    config.logging.app_name = String::new();

    assert!(config.validate().len() >= 3);
}

#[test]
fn test_validate_strict_joins_errors() {
    let mut config = RelayConfig::default();
    config.transport.rate_limit.capacity = 0;

    match config.validate_strict() {
        Err(TransportError::ConfigError(msg)) => {
            assert!(msg.contains("Configuration validation failed"));
            assert!(msg.contains("Rate limit capacity"));
        }
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = RelayConfig::from_toml(
        r#"
        [transport]
        max_message_size = 2048

        [transport.rate_limit]
        capacity = 10
        policy = "discrete"
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(config.transport.max_message_size, 2048);
    assert_eq!(config.transport.rate_limit.capacity, 10);
    assert_eq!(config.transport.rate_limit.policy, RefillPolicy::Discrete);
    assert_eq!(config.transport.rate_limit.window, Duration::from_secs(60));
    assert_eq!(config.transport.health_check_interval, HEALTH_CHECK_INTERVAL);
    assert_eq!(config.logging.app_name, "rpc-relay");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = RelayConfig::from_toml("[transport\nmax_message_size = ");
    assert!(matches!(result, Err(TransportError::ConfigError(_))));
}

#[test]
fn test_example_config_round_trips() {
    let example = RelayConfig::example_config();
    let parsed = RelayConfig::from_toml(&example).expect("example config should parse");
    assert_eq!(parsed.transport.max_message_size, MAX_MESSAGE_SIZE);
    assert!(parsed.validate().is_empty());
}

#[test]
fn test_save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");

    let config = RelayConfig::default_with_overrides(|c| {
        c.transport.rate_limit.capacity = 120;
        c.logging.log_level = Level::DEBUG;
    });
    config.save_to_file(&path).unwrap();

    let loaded = RelayConfig::from_file(&path).unwrap();
    assert_eq!(loaded.transport.rate_limit.capacity, 120);
    assert_eq!(loaded.logging.log_level, Level::DEBUG);
}

#[test]
fn test_missing_file_is_config_error() {
    let result = RelayConfig::from_file("/nonexistent/relay.toml");
    assert!(matches!(result, Err(TransportError::ConfigError(_))));
}

#[test]
fn test_env_overrides() {
    let mut config = RelayConfig::default();
    config
        .apply_env(env(&[
            ("RPC_RELAY_MAX_MESSAGE_SIZE", "4096"),
            ("RPC_RELAY_RATE_LIMIT_CAPACITY", "5"),
            ("RPC_RELAY_RATE_LIMIT_WINDOW_MS", "1000"),
            ("RPC_RELAY_CONNECTION_TIMEOUT_MS", "30000"),
            ("RPC_RELAY_HEALTH_CHECK_INTERVAL_MS", "1000"),
            ("RPC_RELAY_LOG_LEVEL", "warn"),
            ("RPC_RELAY_LOG_JSON", "true"),
        ]))
        .unwrap();

    assert_eq!(config.transport.max_message_size, 4096);
    assert_eq!(config.transport.rate_limit.capacity, 5);
    assert_eq!(config.transport.rate_limit.window, Duration::from_secs(1));
    assert_eq!(config.transport.connection_timeout, Duration::from_secs(30));
    assert_eq!(config.transport.health_check_interval, Duration::from_secs(1));
    assert_eq!(config.logging.log_level, Level::WARN);
    assert!(config.logging.json_format);
    assert!(config.validate().is_empty());
}

#[test]
fn test_env_unset_keeps_defaults() {
    let mut config = RelayConfig::default();
    config.apply_env(env(&[])).unwrap();
    assert_eq!(config.transport.max_message_size, MAX_MESSAGE_SIZE);
}

#[test]
fn test_env_bad_value_rejected() {
    let mut config = RelayConfig::default();
    let result = config.apply_env(env(&[("RPC_RELAY_RATE_LIMIT_CAPACITY", "sixty")]));

    match result {
        Err(TransportError::ConfigError(msg)) => {
            assert!(msg.contains("RPC_RELAY_RATE_LIMIT_CAPACITY"));
        }
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}
