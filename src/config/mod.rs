//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on malformed values. Sensitive
//! values are wrapped in `secrecy::SecretString` to keep them out of logs.

pub mod secrets;

use std::net::SocketAddr;

use secrecy::SecretString;

use crate::engine::TransitionMode;
use crate::error::{Error, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug)]
pub struct Config {
    /// Postgres URL. Only `serve --in-memory` runs without one.
    pub database_url: Option<SecretString>,
    /// Shared secret expected in `x-webhook-secret`. `None` admits every call.
    pub webhook_secret: Option<SecretString>,
    pub bind_addr: SocketAddr,
    pub transition_mode: TransitionMode,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let bind_addr = optional_var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a socket address: {e}")))?;

        let transition_mode = match optional_var("TRANSITION_MODE") {
            Some(mode) => mode.parse()?,
            None => TransitionMode::default(),
        };

        Ok(Self {
            database_url: optional_var("DATABASE_URL").map(SecretString::from),
            webhook_secret: optional_var("WEBHOOK_SECRET").map(SecretString::from),
            bind_addr,
            transition_mode,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// The database URL, or a config error if it is not set.
    pub fn require_database_url(&self) -> Result<&SecretString> {
        self.database_url.as_ref().ok_or_else(|| {
            Error::Config("required environment variable DATABASE_URL is not set".to_string())
        })
    }
}

/// Unset and empty variables both read as `None`.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
