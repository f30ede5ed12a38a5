//! Configuration loader for the `airgradient-proxy` service.
//!
//! All runtime settings come from environment variables (optionally seeded
//! from a `.env` file by the caller). The Timestream database and table are
//! compile-time constants in `store` and are not configurable here.
use std::env;

use anyhow::{anyhow, Result};

use crate::store::DEFAULT_REGION;

/// Parse an optional `u16` environment variable with a default value.
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

/// Application configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// AWS region of the Timestream endpoint.
    pub region: String,

    /// HTTP listen port.
    pub port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `TIMESTREAM_REGION` – AWS region (default: `us-east-1`)
/// - `PORT` – listen port (default: 8080)
pub fn load_from_env() -> Result<Config> {
    // ---
    let region = match env::var("TIMESTREAM_REGION") {
        Ok(v) if v.trim().is_empty() => {
            return Err(anyhow!("TIMESTREAM_REGION must not be empty"));
        }
        Ok(v) => v,
        Err(_) => DEFAULT_REGION.to_string(),
    };
    let port = parse_env_u16!("PORT", 8080);

    Ok(Config { region, port })
}

impl Config {
    /// Log the loaded configuration once at startup.
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  TIMESTREAM_REGION : {}", self.region);
        tracing::info!("  PORT              : {}", self.port);
    }
}
