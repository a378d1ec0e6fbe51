//! Runtime configuration
//!
//! All configuration is resolved once at startup from environment variables
//! (optionally overridden by CLI flags) and passed into router construction
//! as an explicit [`RelayConfig`]; handlers never read globals.
//!
//! # Environment Variables
//!
//! - `PORT` - listening port (default 3000)
//! - `COMMONS_RELAY_BIND` - bind mode: `loopback`, `all`, or an address
//! - `COMMONS_RELAY_API_URL` - upstream API endpoint override
//! - `COMMONS_RELAY_MAX_MEDIA_BYTES` - selection size cap in bytes; setting
//!   it enables the extended variant (category expansion + size filter), and
//!   `0` selects the 5 MiB default cap

use std::env;

use thiserror::Error;

use crate::media::select::DEFAULT_MAX_MEDIA_BYTES;
use crate::server::bind::{parse_bind_mode, BindMode, DEFAULT_PORT};

/// Default upstream API endpoint
pub const DEFAULT_API_URL: &str = "https://commons.wikimedia.org/w/api.php";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid PORT value '{value}': {message}")]
    InvalidPort { value: String, message: String },

    #[error("invalid COMMONS_RELAY_MAX_MEDIA_BYTES value '{value}': {message}")]
    InvalidMaxMediaBytes { value: String, message: String },
}

/// Resolved relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listening port
    pub port: u16,
    /// Bind mode for the listening socket
    pub bind: BindMode,
    /// Upstream API endpoint
    pub api_base_url: String,
    /// Selection size cap; `Some` enables the extended variant
    pub max_media_bytes: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            port: DEFAULT_PORT,
            bind: BindMode::All,
            api_base_url: DEFAULT_API_URL.to_string(),
            max_media_bytes: None,
        }
    }
}

/// Load configuration from the environment.
pub fn load_config() -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();

    if let Some(raw) = env_var("PORT") {
        config.port = raw.parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::InvalidPort {
                value: raw.clone(),
                message: e.to_string(),
            }
        })?;
    }

    if let Some(raw) = env_var("COMMONS_RELAY_BIND") {
        config.bind = parse_bind_mode(&raw);
    }

    if let Some(raw) = env_var("COMMONS_RELAY_API_URL") {
        config.api_base_url = raw;
    }

    if let Some(raw) = env_var("COMMONS_RELAY_MAX_MEDIA_BYTES") {
        let bytes: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::InvalidMaxMediaBytes {
                value: raw.clone(),
                message: e.to_string(),
            }
        })?;
        config.max_media_bytes = Some(if bytes == 0 {
            DEFAULT_MAX_MEDIA_BYTES
        } else {
            bytes
        });
    }

    Ok(config)
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
