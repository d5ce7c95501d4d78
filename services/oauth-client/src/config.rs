//! Configuration types and loading
//!
//! The config file path comes from `--config` or CONFIG_PATH (see `cli`).
//! The client secret is loaded from OAUTH_CLIENT_SECRET or client_secret_file,
//! never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use oauth_token::StaticClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Identifies this client registration in storage keys
    pub client_config_id: String,
    pub client: StaticClientConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Token storage settings
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
}

/// Token endpoint client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. OAUTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.client_config_id.is_empty() {
            return Err(common::Error::Config(
                "client_config_id must not be empty".into(),
            ));
        }

        config.client.validate()?;

        if config.http.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if let Ok(secret) = std::env::var("OAUTH_CLIENT_SECRET") {
            config.client.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.client.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.client.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }
}
