//! Infrastructure configuration loaded from the environment.

use std::time::Duration;

use thiserror::Error;

use pvz_pickup::Catalog;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_CONNECT_DELAY_MS: u64 = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must list at least one value")]
    EmptyList { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Connection attempts at startup before giving up.
    pub db_connect_attempts: u32,
    pub db_connect_delay: Duration,
    pub allowed_cities: Option<Vec<String>>,
    pub allowed_product_types: Option<Vec<String>>,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            db_connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            db_connect_delay: Duration::from_millis(DEFAULT_CONNECT_DELAY_MS),
            allowed_cities: None,
            allowed_product_types: None,
        }
    }
}

impl InfraConfig {
    /// Read `DATABASE_URL`, `PVZ_DB_MAX_CONNECTIONS`, `PVZ_DB_CONNECT_ATTEMPTS`,
    /// `PVZ_DB_CONNECT_DELAY_MS`, `PVZ_ALLOWED_CITIES` and
    /// `PVZ_ALLOWED_PRODUCT_TYPES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self {
            database_url: get("DATABASE_URL"),
            ..Self::default()
        };

        if let Some(raw) = get("PVZ_DB_MAX_CONNECTIONS") {
            config.db_max_connections = positive("PVZ_DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = get("PVZ_DB_CONNECT_ATTEMPTS") {
            config.db_connect_attempts = positive("PVZ_DB_CONNECT_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = get("PVZ_DB_CONNECT_DELAY_MS") {
            config.db_connect_delay =
                Duration::from_millis(positive::<u64>("PVZ_DB_CONNECT_DELAY_MS", &raw)?);
        }
        if let Some(raw) = get("PVZ_ALLOWED_CITIES") {
            config.allowed_cities = Some(list("PVZ_ALLOWED_CITIES", &raw)?);
        }
        if let Some(raw) = get("PVZ_ALLOWED_PRODUCT_TYPES") {
            config.allowed_product_types = Some(list("PVZ_ALLOWED_PRODUCT_TYPES", &raw)?);
        }

        Ok(config)
    }

    /// Allow-lists, falling back to the built-in defaults per list.
    pub fn catalog(&self) -> Catalog {
        let defaults = Catalog::default();
        Catalog::new(
            self.allowed_cities
                .clone()
                .unwrap_or_else(|| defaults.cities().to_vec()),
            self.allowed_product_types
                .clone()
                .unwrap_or_else(|| defaults.product_types().to_vec()),
        )
    }
}

fn positive<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}

fn list(name: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let values: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return Err(ConfigError::EmptyList { name });
    }
    Ok(values)
}
