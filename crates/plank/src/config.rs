//! Server configuration.
//!
//! Loaded from environment variables; every setting has a default, so an
//! empty environment yields a working in-memory server on port 2233.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use plank_auth::CredentialConfig;
use plank_game::ActorConfig;
use thiserror::Error;

/// Default HTTP bind address. The browser client assumes port 2233.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:2233";

/// Default guest nonce lifetime in seconds.
pub const DEFAULT_GUEST_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`PLANK_BIND_ADDRESS`).
    pub bind_address: String,

    /// Directory for durable session state (`PLANK_DATA_DIR`). `None`
    /// keeps sessions in memory for the life of the process.
    pub data_dir: Option<PathBuf>,

    /// Guest nonce lifetime in seconds (`PLANK_GUEST_TTL_SECS`).
    pub guest_ttl_secs: u64,

    /// Evict actors idle this many seconds (`PLANK_IDLE_EVICT_SECS`).
    pub idle_evict_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            data_dir: None,
            guest_ttl_secs: DEFAULT_GUEST_TTL_SECS,
            idle_evict_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} (expected a positive integer)")]
    InvalidNumber { var: String, value: String },
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("PLANK_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let data_dir = vars
            .get("PLANK_DATA_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);

        let guest_ttl_secs =
            parse_secs(vars, "PLANK_GUEST_TTL_SECS")?.unwrap_or(DEFAULT_GUEST_TTL_SECS);

        let idle_evict_secs = parse_secs(vars, "PLANK_IDLE_EVICT_SECS")?;

        Ok(Self {
            bind_address,
            data_dir,
            guest_ttl_secs,
            idle_evict_secs,
        })
    }

    pub fn actor_config(&self) -> ActorConfig {
        ActorConfig {
            idle_timeout: self.idle_evict_secs.map(Duration::from_secs),
            ..ActorConfig::default()
        }
    }

    pub fn credential_config(&self) -> CredentialConfig {
        CredentialConfig {
            guest_ttl_secs: self.guest_ttl_secs,
        }
    }
}

fn parse_secs(vars: &HashMap<String, String>, var: &str) -> Result<Option<u64>, ConfigError> {
    let Some(value) = vars.get(var) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(secs)),
        _ => Err(ConfigError::InvalidNumber {
            var: var.to_string(),
            value: value.clone(),
        }),
    }
}
