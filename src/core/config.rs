//! Client configuration
//!
//! Connection settings for the remote battery authority. Loaded from a TOML
//! file at startup; the in-memory ledger does not need any of this.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Result, TrilhaError};

/// Default request timeout in seconds.
///
/// A hung request resolves to the transport-failure path instead of leaving
/// the store's loading flag stuck.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 12;

/// Configuration for the HTTP authority client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the remote authority (e.g. `https://api.example.com`)
    pub authority_url: String,

    /// API key sent with every request
    pub api_key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    /// Load a config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&text)
            .map_err(|e| TrilhaError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Create a config from environment variables
    ///
    /// Required: TRILHA_AUTHORITY_URL, TRILHA_API_KEY
    pub fn from_env() -> Result<Self> {
        let authority_url = std::env::var("TRILHA_AUTHORITY_URL")
            .map_err(|_| TrilhaError::InvalidConfig("TRILHA_AUTHORITY_URL not set".into()))?;
        let api_key = std::env::var("TRILHA_API_KEY")
            .map_err(|_| TrilhaError::InvalidConfig("TRILHA_API_KEY not set".into()))?;

        let config = Self {
            authority_url,
            api_key,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.authority_url.is_empty() {
            return Err(TrilhaError::InvalidConfig("authority_url is empty".into()));
        }
        if !self.authority_url.starts_with("http") {
            return Err(TrilhaError::InvalidConfig(format!(
                "authority_url must be http(s): {}",
                self.authority_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(TrilhaError::InvalidConfig(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: ClientConfig = toml::from_str(
            r#"
            authority_url = "https://api.example.com"
            api_key = "anon-key"
            "#,
        )
        .unwrap();
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reject_bad_url() {
        let config = ClientConfig {
            authority_url: "ftp://nope".into(),
            api_key: "k".into(),
            request_timeout_secs: 12,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_zero_timeout() {
        let config = ClientConfig {
            authority_url: "https://api.example.com".into(),
            api_key: "k".into(),
            request_timeout_secs: 0,
        };
        assert!(config.validate().is_err());
    }
}
