//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `NATS_URL` - Publish cart events to NATS when set
//! - `CART_EVENTS_SUBJECT` - Subject prefix for cart events (default: cart.events)
//! - `CART_MAX_REASONABLE_QTY` - Quantity above which a line is suspicious (default: 10)
//! - `CART_CURRENCY` - ISO 4217 currency of catalog prices (default: USD)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

use crate::domain::resolver::MAX_REASONABLE_QTY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(String),
    #[error("Invalid environment variable {0}: {1}")]
    Invalid(String, String),
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub nats_url: Option<String>,
    pub events_subject: String,
    pub max_reasonable_quantity: u32,
    pub currency: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("nats_url", &self.nats_url)
            .field("events_subject", &self.events_subject)
            .field("max_reasonable_quantity", &self.max_reasonable_quantity)
            .field("currency", &self.currency)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or_else(|| ConfigError::Missing("DATABASE_URL".into()))?;

        let max_reasonable_quantity = parse_or(&get, "CART_MAX_REASONABLE_QTY", MAX_REASONABLE_QTY)?;
        if max_reasonable_quantity == 0 {
            return Err(ConfigError::Invalid("CART_MAX_REASONABLE_QTY".into(), "must be at least 1".into()));
        }

        let currency = get("CART_CURRENCY").unwrap_or_else(|| "USD".to_string()).to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid("CART_CURRENCY".into(), format!("'{currency}' is not an ISO 4217 code")));
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: parse_or(&get, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&get, "PORT", 8083)?,
            nats_url: get("NATS_URL"),
            events_subject: get("CART_EVENTS_SUBJECT").unwrap_or_else(|| "cart.events".to_string()),
            max_reasonable_quantity,
            currency,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/cart")]).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.max_reasonable_quantity, 10);
        assert_eq!(config.currency, "USD");
        assert_eq!(config.events_subject, "cart.events");
        assert!(config.nats_url.is_none());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8083");
    }

    #[test]
    fn test_database_url_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("DATABASE_URL".into()));
        assert_eq!(load(&[("DATABASE_URL", "  ")]).unwrap_err(), ConfigError::Missing("DATABASE_URL".into()));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/cart"),
            ("PORT", "9000"),
            ("HOST", "127.0.0.1"),
            ("CART_MAX_REASONABLE_QTY", "25"),
            ("CART_CURRENCY", "ngn"),
            ("NATS_URL", "nats://localhost:4222"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.max_reasonable_quantity, 25);
        assert_eq!(config.currency, "NGN");
        assert_eq!(config.nats_url.as_deref(), Some("nats://localhost:4222"));
    }

    #[test]
    fn test_invalid_values() {
        let base = ("DATABASE_URL", "postgres://db/cart");
        assert!(matches!(load(&[base, ("PORT", "http")]), Err(ConfigError::Invalid(k, _)) if k == "PORT"));
        assert!(matches!(load(&[base, ("CART_MAX_REASONABLE_QTY", "0")]), Err(ConfigError::Invalid(..))));
        assert!(matches!(load(&[base, ("CART_CURRENCY", "dollars")]), Err(ConfigError::Invalid(..))));
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://user:hunter2@db/cart")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
