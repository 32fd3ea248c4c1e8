//! Configuration management utilities

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::DEFAULT_HTTP_TIMEOUT_SECS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("Invalid endpoint path '{path}': {reason}")]
    InvalidEndpoint { path: String, reason: String },
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

/// Connection settings for the Qualis web API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConnectionConfig {
    /// Base URL, always ending with a `/` so relative endpoints join under it
    pub base_url: Url,
    /// User token, sent as the basic-auth login with an empty password
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl ServerConnectionConfig {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ConfigError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let base_url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidServerUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        match base_url.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self {
            base_url,
            token: token.filter(|t| !t.is_empty()),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        })
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Resolve an API path such as `api/alm_settings/list` against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ConfigError::InvalidEndpoint {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}
