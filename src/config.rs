//! Configuration loader for the `codemetal-qctrack` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;

use anyhow::{anyhow, Result};

use crate::geometry::FrameSize;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional port environment variable with a default value.
macro_rules! parse_env_u16 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// TCP port the HTTP server binds on all interfaces.
    pub listen_port: u16,

    /// Bearer token required on `/admin/*` routes.
    pub admin_token: String,

    /// Frame the calibration wizard and annotation UI capture at. Calibration
    /// scale factors are expressed at this resolution.
    pub capture: FrameSize,

    /// Native resolution of the industrial camera used by the operator panel.
    pub native: FrameSize,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `ADMIN_TOKEN` – bearer token for admin routes
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `CAPTURE_WIDTH` / `CAPTURE_HEIGHT` – capture frame (default: 1920x1080)
/// - `NATIVE_WIDTH` / `NATIVE_HEIGHT` – industrial camera frame (default: 5488x3672)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let admin_token = require_env!("ADMIN_TOKEN");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let listen_port = parse_env_u16!("LISTEN_PORT", 8080);

    let capture = FrameSize {
        width: parse_env_u32!("CAPTURE_WIDTH", 1920),
        height: parse_env_u32!("CAPTURE_HEIGHT", 1080),
    };
    let native = FrameSize {
        width: parse_env_u32!("NATIVE_WIDTH", 5488),
        height: parse_env_u32!("NATIVE_HEIGHT", 3672),
    };

    if admin_token.trim().is_empty() {
        return Err(anyhow!("ADMIN_TOKEN must not be empty"));
    }
    for (name, frame) in [("CAPTURE", capture), ("NATIVE", native)] {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("{name}_WIDTH and {name}_HEIGHT must be non-zero"));
        }
    }

    Ok(Config {
        db_url,
        db_pool_max,
        listen_port,
        admin_token,
        capture,
        native,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords and the admin
    /// token while showing all other configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL   : {}", self.masked_db_url());
        tracing::info!("  ADMIN_TOKEN    : ****");
        tracing::info!("  DB_POOL_MAX    : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT    : {}", self.listen_port);
        tracing::info!(
            "  CAPTURE        : {}x{}",
            self.capture.width,
            self.capture.height
        );
        tracing::info!(
            "  NATIVE         : {}x{}",
            self.native.width,
            self.native.height
        );
    }

    /// Database URL with the password segment replaced by `****`.
    pub fn masked_db_url(&self) -> String {
        // ---
        if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                return format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                );
            }
        }
        self.db_url.clone()
    }
}
