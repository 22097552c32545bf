//! Configuration types for the Benchdeck core

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for Benchdeck
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchdeckConfig {
    /// Evaluation backend connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Server-state cache behavior
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Evaluation backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the evaluation backend
    pub base_url: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Server-state cache settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Age after which a cached collection is considered stale and a read
    /// triggers a background refetch. When unset, entries only go stale
    /// through explicit invalidation.
    #[serde(default, with = "humantime_serde::option")]
    pub stale_after: Option<Duration>,
}

impl BenchdeckConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (benchdeck.toml or path from BENCHDECK_CONFIG_PATH)
    /// 3. Environment variable overrides, prefixed with `BENCHDECK_` and using
    ///    `__` between sections (e.g. `BENCHDECK_SERVER__BASE_URL`)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is invalid or the merged
    /// configuration fails validation.
    pub fn load() -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Toml},
        };

        let mut figment = Figment::new()
            .merge(Toml::file("benchdeck.toml"))
            .merge(Env::prefixed("BENCHDECK_").split("__"));

        // Check for custom config path
        if let Ok(path) = std::env::var("BENCHDECK_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: BenchdeckConfig = figment.extract().map_err(|e| {
            crate::error::BenchdeckError::Configuration(format!(
                "Failed to load configuration: {}",
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Toml},
        };

        let config: BenchdeckConfig =
            Figment::new()
                .merge(Toml::file(path))
                .extract()
                .map_err(|e| {
                    crate::error::BenchdeckError::Configuration(format!(
                        "Failed to load configuration file: {}",
                        e
                    ))
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> crate::error::Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(crate::error::BenchdeckError::Configuration(
                "server.base_url must not be empty".to_string(),
            ));
        }
        if !self.server.base_url.starts_with("http://")
            && !self.server.base_url.starts_with("https://")
        {
            return Err(crate::error::BenchdeckError::Configuration(format!(
                "server.base_url must be an http(s) URL, got: {}",
                self.server.base_url
            )));
        }
        if self.server.request_timeout.is_zero() {
            return Err(crate::error::BenchdeckError::Configuration(
                "server.request_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BenchdeckConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.server.request_timeout, Duration::from_secs(30));
        assert!(config.cache.stale_after.is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nbase_url = \"https://eval.example.com\"\nrequest_timeout = \"10s\"\n\n[cache]\nstale_after = \"1m\"\n"
        )
        .unwrap();

        let config = BenchdeckConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.base_url, "https://eval.example.com");
        assert_eq!(config.server.request_timeout, Duration::from_secs(10));
        assert_eq!(config.cache.stale_after, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbase_url = \"ftp://nope\"\nrequest_timeout = \"10s\"\n").unwrap();

        let err = BenchdeckConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }
}
