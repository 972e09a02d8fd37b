//! # gx-config
//!
//! Layered runtime configuration: built-in defaults, then an optional
//! `ghostx.toml` in the working directory, then `GHOSTX_*` environment
//! variables (nested keys use `__`, e.g. `GHOSTX_SERVER__PORT=9090`).

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const FILE_STEM: &str = "ghostx";
const ENV_PREFIX: &str = "GHOSTX";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Only read when the SQLite plugin is compiled in.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub summary_window_hours: i64,
    pub merged_feed_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite:ghostx.db")?
        .set_default("feed.summary_window_hours", 2)?
        .set_default("feed.merged_feed_limit", 20)
}

fn validate(config: AppConfig) -> Result<AppConfig, ConfigError> {
    if config.feed.summary_window_hours <= 0 {
        return Err(ConfigError::Message(
            "feed.summary_window_hours must be positive".into(),
        ));
    }
    if config.feed.merged_feed_limit == 0 {
        return Err(ConfigError::Message("feed.merged_feed_limit must be positive".into()));
    }
    Ok(config)
}

impl AppConfig {
    /// Loads `.env`, then every configuration layer.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        let config = defaults()?
            .add_source(File::with_name(FILE_STEM).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        validate(config)
    }

    /// Defaults overlaid with a TOML document. Environment is not consulted.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config = defaults()?
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        validate(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(config.database.url, "sqlite:ghostx.db");
        assert_eq!(config.feed.summary_window_hours, 2);
        assert_eq!(config.feed.merged_feed_limit, 20);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9090

            [feed]
            merged_feed_limit = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.feed.merged_feed_limit, 50);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_toml("[feed]\nsummary_window_hours = 0").is_err());
        assert!(AppConfig::from_toml("[server]\nport = \"http\"").is_err());
    }
}
