//! HTTP server configuration.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiConfigError {
    #[error("PVZ_BIND_ADDR is not a socket address: '{0}'")]
    InvalidBindAddr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    /// Read `PVZ_BIND_ADDR`, defaulting to `0.0.0.0:8080`.
    pub fn from_env() -> Result<Self, ApiConfigError> {
        Self::from_bind_addr(std::env::var("PVZ_BIND_ADDR").ok().as_deref())
    }

    pub fn from_bind_addr(raw: Option<&str>) -> Result<Self, ApiConfigError> {
        let raw = raw.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = raw
            .parse()
            .map_err(|_| ApiConfigError::InvalidBindAddr(raw.to_string()))?;
        Ok(Self { bind_addr })
    }
}
