//! Configuration resolution for scoutlink-ingest
//!
//! Every field resolves ENV (`SCOUTLINK_*`) over TOML over compiled
//! default. Secrets have no defaults; a missing one is a startup error
//! with a hint on how to set it.

use std::path::PathBuf;

use scoutlink_common::config::{self, TomlConfig};
use scoutlink_common::{Error, Result};

use crate::services::worker::WorkerSettings;

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database_path: PathBuf,
    pub bind_host: String,
    pub bind_port: u16,
    /// Shared secret expected in the webhook secret header
    pub webhook_secret: String,
    /// Shared secret accepted on the worker trigger endpoint
    pub worker_secret: String,
    /// Bearer token accepted from the external scheduler, when configured
    pub worker_bearer_token: Option<String>,
    pub player_api_base: Option<String>,
    pub player_api_token: String,
    pub messaging_api_base: String,
    pub messaging_api_token: String,
    pub messaging_sender_id: String,
    pub staleness_minutes: i64,
    pub confirmation_expiry_hours: i64,
    pub worker_batch_size: i64,
}

impl IngestConfig {
    /// Resolve the final configuration from a parsed TOML file and the
    /// environment
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let database_path = string_field("database_path", toml.database_path.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| config::default_data_folder().join("scoutlink.db"));

        let bind_host = string_field("bind_host", toml.bind_host.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let bind_port = match config::env_override("bind_port") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("Invalid SCOUTLINK_BIND_PORT: {}", raw)))?,
            None => toml.bind_port.unwrap_or(5810),
        };

        Ok(Self {
            database_path,
            bind_host,
            bind_port,
            webhook_secret: required("webhook_secret", toml.webhook_secret.clone())?,
            worker_secret: required("worker_secret", toml.worker_secret.clone())?,
            worker_bearer_token: string_field("worker_bearer_token", toml.worker_bearer_token.clone()),
            player_api_base: string_field("player_api_base", toml.player_api_base.clone()),
            player_api_token: required("player_api_token", toml.player_api_token.clone())?,
            messaging_api_base: string_field("messaging_api_base", toml.messaging_api_base.clone())
                .unwrap_or_else(|| "https://graph.facebook.com/v19.0".to_string()),
            messaging_api_token: required("messaging_api_token", toml.messaging_api_token.clone())?,
            messaging_sender_id: required("messaging_sender_id", toml.messaging_sender_id.clone())?,
            staleness_minutes: int_field("staleness_minutes", toml.staleness_minutes)?.unwrap_or(10),
            confirmation_expiry_hours: int_field("confirmation_expiry_hours", toml.confirmation_expiry_hours)?
                .unwrap_or(72),
            worker_batch_size: int_field("worker_batch_size", toml.worker_batch_size)?.unwrap_or(10),
        })
    }

    /// Worker tunables derived from the config
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            staleness_minutes: self.staleness_minutes,
            confirmation_expiry_hours: self.confirmation_expiry_hours,
            batch_size: self.worker_batch_size,
        }
    }
}

fn string_field(key: &str, toml_value: Option<String>) -> Option<String> {
    config::env_override(key).or(toml_value)
}

fn int_field(key: &str, toml_value: Option<i64>) -> Result<Option<i64>> {
    match config::env_override(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid SCOUTLINK_{}: {}", key.to_uppercase(), raw))),
        None => Ok(toml_value),
    }
}

fn required(key: &str, toml_value: Option<String>) -> Result<String> {
    string_field(key, toml_value).ok_or_else(|| {
        Error::Config(format!(
            "{} is not configured. Set SCOUTLINK_{} or add {} to the config file.",
            key,
            key.to_uppercase(),
            key
        ))
    })
}
