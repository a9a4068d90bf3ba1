//! Service configuration loaded from `TRACKER_*` environment variables

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

/// Where kiosk state is kept between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KioskBackend {
    Memory,
    Redis,
}

/// API service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to
    pub bind_address: String,
    /// HMAC secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Bearer token lifetime in seconds (default: 12 hours)
    pub token_expiry: u64,
    pub kiosk_backend: KioskBackend,
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
    pub login_ban_seconds: u64,
}

impl AppConfig {
    /// Load the configuration from the environment
    ///
    /// # Environment Variables
    /// - `TRACKER_BIND_ADDRESS` (default: `0.0.0.0:3001`)
    /// - `TRACKER_JWT_SECRET` (required)
    /// - `TRACKER_TOKEN_EXPIRY` (default: 43200)
    /// - `TRACKER_KIOSK_BACKEND`: `memory` or `redis` (default: `memory`)
    /// - `TRACKER_LOGIN_MAX_ATTEMPTS` (default: 5)
    /// - `TRACKER_LOGIN_WINDOW_SECONDS` (default: 300)
    /// - `TRACKER_LOGIN_BAN_SECONDS` (default: 900)
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder()
            .set_default("bind_address", "0.0.0.0:3001")?
            .set_default("token_expiry", 43200)?
            .set_default("kiosk_backend", "memory")?
            .set_default("login_max_attempts", 5)?
            .set_default("login_window_seconds", 300)?
            .set_default("login_ban_seconds", 900)?
            .add_source(Environment::with_prefix("TRACKER").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Invalid TRACKER_* configuration")?;

        if config.jwt_secret.trim().is_empty() {
            anyhow::bail!("TRACKER_JWT_SECRET must not be empty");
        }
        if config.token_expiry == 0 {
            anyhow::bail!("TRACKER_TOKEN_EXPIRY must be positive");
        }

        Ok(config)
    }
}
