//! Configuration loading for scoutlink services
//!
//! Resolution priority for every field:
//! 1. Environment variable (`SCOUTLINK_*`)
//! 2. TOML config file
//! 3. Compiled default (where one exists)
//!
//! The config file path itself resolves as `SCOUTLINK_CONFIG` env var, then
//! `~/.config/scoutlink/scoutlink.toml`, then `/etc/scoutlink/scoutlink.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Raw TOML configuration file contents
///
/// Every field is optional; missing values fall back to environment
/// variables and compiled defaults in the service-level config resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file path
    pub database_path: Option<String>,
    /// HTTP bind host (default 127.0.0.1)
    pub bind_host: Option<String>,
    /// HTTP bind port
    pub bind_port: Option<u16>,
    /// Shared secret expected on inbound webhook requests
    pub webhook_secret: Option<String>,
    /// Shared secret accepted on the worker trigger endpoint
    pub worker_secret: Option<String>,
    /// Bearer token accepted from the external scheduler
    pub worker_bearer_token: Option<String>,
    /// Player database API base URL
    pub player_api_base: Option<String>,
    /// Player database API token
    pub player_api_token: Option<String>,
    /// Messaging provider API base URL
    pub messaging_api_base: Option<String>,
    /// Messaging provider API token
    pub messaging_api_token: Option<String>,
    /// Messaging provider sender (phone number id)
    pub messaging_sender_id: Option<String>,
    /// Minutes before an in-flight resolution is considered abandoned
    pub staleness_minutes: Option<i64>,
    /// Hours before an unanswered confirmation request is failed
    pub confirmation_expiry_hours: Option<i64>,
    /// Maximum targets advanced per worker invocation
    pub worker_batch_size: Option<i64>,
}

/// Resolve the config file path for the platform
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SCOUTLINK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("scoutlink").join("scoutlink.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/scoutlink/scoutlink.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Load the TOML config file, or defaults when no file exists
pub fn load_toml_config() -> Result<TomlConfig> {
    match config_file_path() {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
            let config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Environment override lookup: `SCOUTLINK_<KEY>` (upper-cased)
pub fn env_override(key: &str) -> Option<String> {
    std::env::var(format!("SCOUTLINK_{}", key.to_uppercase())).ok()
}

/// OS-dependent default data folder for the database
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("scoutlink"))
        .unwrap_or_else(|| PathBuf::from("./scoutlink_data"))
}
