//! Configuration loading and override resolution
//!
//! Every option resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default user agent sent to every upstream (Wikimedia requires one)
pub const DEFAULT_USER_AGENT: &str =
    concat!("wenc/", env!("CARGO_PKG_VERSION"), " (world encyclopedia aggregator)");

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WencConfig {
    /// Lifetime of cached upstream responses, in seconds
    pub cache_ttl_secs: u64,
    /// Lifetime of cached weather responses, in seconds (conditions change faster)
    pub weather_cache_ttl_secs: u64,
    /// Timeout applied to each upstream call, in seconds
    pub request_timeout_secs: u64,
    /// Maximum number of relation edges requested from the knowledge graph
    pub max_relations: usize,
    /// Maximum number of images requested from the media repository
    pub max_images: usize,
    /// Maximum number of linked pages checked for coordinates (0 disables)
    pub max_geo_mentions: usize,
    /// Maximum number of edges in the relationship graph neighbourhood
    pub max_graph_edges: usize,
    /// Number of search candidates requested from the encyclopedia
    pub search_limit: usize,
    /// Politeness limit across all upstreams
    pub requests_per_second: u32,
    /// Fall back to a knowledge-graph label match when search finds nothing
    pub label_search_fallback: bool,
    /// User-Agent header for upstream requests
    pub user_agent: String,
    /// Upstream base URLs
    pub endpoints: EndpointConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for WencConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            weather_cache_ttl_secs: 300,
            request_timeout_secs: 15,
            max_relations: 200,
            max_images: 5,
            max_geo_mentions: 30,
            max_graph_edges: 80,
            search_limit: 10,
            requests_per_second: 5,
            label_search_fallback: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            endpoints: EndpointConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Upstream base URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub encyclopedia: String,
    pub knowledge_graph: String,
    pub countries: String,
    pub weather: String,
    pub media: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            encyclopedia: "https://en.wikipedia.org/w/api.php".to_string(),
            knowledge_graph: "https://query.wikidata.org/sparql".to_string(),
            countries: "https://restcountries.com/v3.1".to_string(),
            weather: "https://api.open-meteo.com/v1/forecast".to_string(),
            media: "https://commons.wikimedia.org/w/api.php".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (e.g. "info", "wenc_agg=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line; `None` leaves the lower tiers in effect
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cache_ttl_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_relations: Option<usize>,
    pub max_images: Option<usize>,
    pub max_geo_mentions: Option<usize>,
}

impl WencConfig {
    /// Resolve configuration from all tiers
    ///
    /// # Arguments
    /// * `config_path` - Explicit TOML path (must exist); when `None` the
    ///   platform default path is used if present
    /// * `overrides` - Command-line values
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_toml_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_toml_file(&path)?,
                None => {
                    debug!("No config file found, using compiled defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply `WENC_*` environment variables through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_env(&lookup, "WENC_CACHE_TTL_SECS")? {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_WEATHER_CACHE_TTL_SECS")? {
            self.weather_cache_ttl_secs = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_REQUEST_TIMEOUT_SECS")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_MAX_RELATIONS")? {
            self.max_relations = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_MAX_IMAGES")? {
            self.max_images = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_MAX_GEO_MENTIONS")? {
            self.max_geo_mentions = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_MAX_GRAPH_EDGES")? {
            self.max_graph_edges = v;
        }
        if let Some(v) = parse_env(&lookup, "WENC_REQUESTS_PER_SECOND")? {
            self.requests_per_second = v;
        }
        if let Some(v) = lookup("WENC_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.user_agent = v;
        }
        if let Some(v) = lookup("WENC_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Apply command-line values (highest priority)
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.cache_ttl_secs {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = overrides.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = overrides.max_relations {
            self.max_relations = v;
        }
        if let Some(v) = overrides.max_images {
            self.max_images = v;
        }
        if let Some(v) = overrides.max_geo_mentions {
            self.max_geo_mentions = v;
        }
    }

    /// Reject settings that would make the aggregator useless
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.cache_ttl_secs == 0, "cache_ttl_secs must be greater than 0"),
            (
                self.weather_cache_ttl_secs == 0,
                "weather_cache_ttl_secs must be greater than 0",
            ),
            (
                self.request_timeout_secs == 0,
                "request_timeout_secs must be greater than 0",
            ),
            (self.max_relations == 0, "max_relations must be greater than 0"),
            (self.max_graph_edges == 0, "max_graph_edges must be greater than 0"),
            (self.search_limit == 0, "search_limit must be greater than 0"),
            (
                self.requests_per_second == 0,
                "requests_per_second must be greater than 0",
            ),
            (self.user_agent.trim().is_empty(), "user_agent must not be empty"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(Error::Config((*message).to_string())),
            None => Ok(()),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn weather_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", name, raw))),
        None => Ok(None),
    }
}

/// Platform config file path: `<config_dir>/wenc/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wenc").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WencConfig::default();
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.max_images, 5);
        assert!(!config.label_search_fallback);
        assert!(config.user_agent.starts_with("wenc/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WencConfig::from_toml_str(
            r#"
            max_relations = 50

            [endpoints]
            weather = "http://localhost:9000/forecast"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_relations, 50);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.endpoints.weather, "http://localhost:9000/forecast");
        assert_eq!(
            config.endpoints.encyclopedia,
            EndpointConfig::default().encyclopedia
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = WencConfig::from_toml_str("max_relations = \"lots\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides_toml() {
        let mut config = WencConfig::from_toml_str("max_images = 2").unwrap();
        config
            .apply_env(env_from(&[
                ("WENC_MAX_IMAGES", "9"),
                ("WENC_CACHE_TTL_SECS", " 60 "),
                ("WENC_LOG_LEVEL", "debug"),
            ]))
            .unwrap();
        assert_eq!(config.max_images, 9);
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_rejects_garbage_numbers() {
        let mut config = WencConfig::default();
        let err = config
            .apply_env(env_from(&[("WENC_REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("WENC_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn test_blank_user_agent_env_is_ignored() {
        let mut config = WencConfig::default();
        config
            .apply_env(env_from(&[("WENC_USER_AGENT", "   ")]))
            .unwrap();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = WencConfig::default();
        config
            .apply_env(env_from(&[("WENC_MAX_RELATIONS", "10")]))
            .unwrap();
        config.apply_overrides(&ConfigOverrides {
            max_relations: Some(25),
            ..Default::default()
        });
        assert_eq!(config.max_relations, 25);
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = WencConfig {
            cache_ttl_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache_ttl_secs"));
    }

    #[test]
    fn test_zero_images_and_mentions_are_allowed() {
        let config = WencConfig {
            max_images: 0,
            max_geo_mentions: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_graph_settings() {
        let mut config = WencConfig::default();
        assert_eq!(config.max_geo_mentions, 30);
        assert_eq!(config.max_graph_edges, 80);

        config
            .apply_env(env_from(&[("WENC_MAX_GEO_MENTIONS", "12"), ("WENC_MAX_GRAPH_EDGES", "0")]))
            .unwrap();
        assert_eq!(config.max_geo_mentions, 12);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_graph_edges"));
    }
}
