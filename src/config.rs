//! Process configuration read from the environment.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub currency: String,
    pub lock_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            port: number(&get, "PORT", 5000)?,
            database_url: present("DATABASE_URL"),
            database_max_connections: number(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            nats_url: present("NATS_URL"),
            currency: present("MARKETPLACE_CURRENCY").unwrap_or_else(|| "INR".to_string()),
            lock_timeout: Duration::from_millis(number(&get, "LOCK_TIMEOUT_MS", 2000)?),
        })
    }
}

fn number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::NotANumber { key, value }),
    }
}
