//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)
//!
//! The result is loaded once at startup and shared immutably.

use serde::Deserialize;

/// Fallback database location when neither a file nor the environment sets one.
const DEFAULT_DATABASE_URL: &str = "sqlite://data/easyadventure.db";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string, e.g. "sqlite://data/easyadventure.db"
    pub url: String,
    /// Apply `schema.sql` at startup (CREATE TABLE IF NOT EXISTS)
    #[serde(default)]
    pub bootstrap_schema: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (EASYADVENTURE__*)
    /// 5. `DATABASE_URL`, which always wins for `database.url`
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        Self::load_from("config", std::env::var("DATABASE_URL").ok())
    }

    /// Load with `config_dir` as the directory holding `default`/`local`
    /// files and an explicit database URL override.
    pub(crate) fn load_from(
        config_dir: &str,
        database_url: Option<String>,
    ) -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let database_url = database_url.filter(|url| !url.trim().is_empty());

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.max_body_bytes", 64 * 1024)?
            .set_default("database.url", DEFAULT_DATABASE_URL)?
            .set_default("database.bootstrap_schema", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            .add_source(File::with_name(&format!("{config_dir}/local")).required(false))
            .add_source(
                Environment::with_prefix("EASYADVENTURE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", database_url)?
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        let url = self.database.url.trim();
        if url.is_empty() {
            return Err(crate::error::AppError::Config(
                "database.url must not be empty".to_string(),
            ));
        }
        if !url.starts_with("sqlite:") {
            return Err(crate::error::AppError::Config(format!(
                "database.url must be a sqlite: connection string, got {url}"
            )));
        }

        if self.server.max_body_bytes == 0 {
            return Err(crate::error::AppError::Config(
                "server.max_body_bytes must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        Ok(())
    }
}
