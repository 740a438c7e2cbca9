//! Configuration management for the atelier production server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with ATELIER_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Batch and costing settings
    pub production: ProductionConfig,

    /// Log output settings
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProductionConfig {
    /// Prefix for regular batch references (BATCH-YYYYMMDD-XXXXXX)
    pub batch_reference_prefix: String,

    /// Prefix for sub-contracted batch references
    pub subcontract_reference_prefix: String,

    /// Decimal places used when costs are rendered
    pub cost_scale: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// `pretty` or `json`
    pub format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("ATELIER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("production.batch_reference_prefix", "BATCH")?
            .set_default("production.subcontract_reference_prefix", "BATCH-ST")?
            .set_default("production.cost_scale", 2)?
            .set_default("log.format", "pretty")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (ATELIER_ prefix)
            .add_source(
                Environment::with_prefix("ATELIER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl ProductionConfig {
    pub fn reference_prefix(&self, product_type: shared::ProductType) -> &str {
        match product_type {
            shared::ProductType::Regular => &self.batch_reference_prefix,
            shared::ProductType::Soustraitance => &self.subcontract_reference_prefix,
        }
    }
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            batch_reference_prefix: "BATCH".to_string(),
            subcontract_reference_prefix: "BATCH-ST".to_string(),
            cost_scale: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_prefix_follows_product_type() {
        let cfg = ProductionConfig::default();
        assert_eq!(cfg.reference_prefix(shared::ProductType::Regular), "BATCH");
        assert_eq!(cfg.reference_prefix(shared::ProductType::Soustraitance), "BATCH-ST");
    }
}
