//! Configuration loading across file, environment and command line
//!
//! Tests that touch `WENC_*` variables are marked `#[serial]` so they never
//! race each other.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use wenc_common::config::ConfigOverrides;
use wenc_common::{Error, WencConfig};

const ENV_VARS: &[&str] = &[
    "WENC_CACHE_TTL_SECS",
    "WENC_WEATHER_CACHE_TTL_SECS",
    "WENC_REQUEST_TIMEOUT_SECS",
    "WENC_MAX_RELATIONS",
    "WENC_MAX_IMAGES",
    "WENC_MAX_GEO_MENTIONS",
    "WENC_MAX_GRAPH_EDGES",
    "WENC_REQUESTS_PER_SECOND",
    "WENC_USER_AGENT",
    "WENC_LOG_LEVEL",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_file_then_env_then_cli() {
    clear_env();
    let file = config_file(
        r#"
cache_ttl_secs = 600
max_relations = 50
max_images = 2

[endpoints]
weather = "http://localhost:9000/forecast"

[logging]
level = "debug"
"#,
    );
    env::set_var("WENC_MAX_RELATIONS", "75");
    env::set_var("WENC_LOG_LEVEL", "warn");

    let overrides = ConfigOverrides {
        max_images: Some(9),
        ..ConfigOverrides::default()
    };
    let config = WencConfig::load(Some(file.path()), &overrides).unwrap();
    clear_env();

    assert_eq!(config.cache_ttl(), Duration::from_secs(600)); // file
    assert_eq!(config.max_relations, 75); // env beats file
    assert_eq!(config.max_images, 9); // cli beats file
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.endpoints.weather, "http://localhost:9000/forecast");
    assert_eq!(config.endpoints.countries, "https://restcountries.com/v3.1");
    assert_eq!(config.request_timeout(), Duration::from_secs(15));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = WencConfig::load(Some(&missing), &ConfigOverrides::default());
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("nope.toml")));
}

#[test]
#[serial]
fn test_invalid_env_number_is_an_error() {
    clear_env();
    let file = config_file("");
    env::set_var("WENC_REQUEST_TIMEOUT_SECS", "soon");

    let result = WencConfig::load(Some(file.path()), &ConfigOverrides::default());
    clear_env();

    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("WENC_REQUEST_TIMEOUT_SECS")));
}

#[test]
#[serial]
fn test_zero_from_cli_fails_validation() {
    clear_env();
    let file = config_file("");
    let overrides = ConfigOverrides {
        request_timeout_secs: Some(0),
        ..ConfigOverrides::default()
    };

    let result = WencConfig::load(Some(file.path()), &overrides);
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("request_timeout_secs")));
}

#[test]
#[serial]
fn test_empty_file_yields_defaults() {
    clear_env();
    let file = config_file("# nothing configured\n");
    let config = WencConfig::load(Some(file.path()), &ConfigOverrides::default()).unwrap();
    assert_eq!(config, WencConfig::default());
}
