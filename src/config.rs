use std::str::FromStr;
use std::time::Duration;

use crate::domain::order::ORDER_CREATED_TOPIC;

// ============================================================================
// Process Configuration
// ============================================================================
//
// Read once at startup from the environment and handed to each component
// that needs it. Nothing reads the environment after `main` builds this.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub kafka_brokers: String,
    pub publish_timeout: Duration,
    pub order_created_topic: String,
    pub consumer_group: String,
    pub catalog_url: String,
    pub catalog_timeout: Duration,
    pub metrics_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?,
            kafka_brokers: get("KAFKA_BROKERS").unwrap_or_else(|| "localhost:9092".to_string()),
            publish_timeout: Duration::from_millis(parse_or(&get, "KAFKA_PUBLISH_TIMEOUT_MS", 5000)?),
            order_created_topic: get("ORDER_CREATED_TOPIC")
                .unwrap_or_else(|| ORDER_CREATED_TOPIC.to_string()),
            consumer_group: get("ORDER_CONSUMER_GROUP").unwrap_or_else(|| "orders-group".to_string()),
            catalog_url: get("CATALOG_URL").unwrap_or_else(|| "http://localhost:8082".to_string()),
            catalog_timeout: Duration::from_millis(parse_or(&get, "CATALOG_TIMEOUT_MS", 3000)?),
            metrics_port: parse_or(&get, "METRICS_PORT", 9090)?,
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("{:?}: {}", raw, e),
        }),
    }
}
