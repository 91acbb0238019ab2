//! Configuration for the meshgate gateway.
//!
//! A TOML file names the registry endpoint and the gateway's own cloud
//! credential; environment variables under the `MESHGATE_` prefix
//! override individual fields. Credential width violations are rejected
//! here, at the boundary, before the core ever sees them.
//!
//! ```toml
//! protocol = "http"
//! interval = 10
//!
//! [cloud]
//! host = "registry.example.com"
//! port = 3000
//! uuid = "11111111-1111-1111-1111-111111111111"
//! token = "0123456789012345678901234567890123456789"
//! ```

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use meshgate_core::SessionConfig;
use meshgate_proto::Credential;

/// Environment variable prefix for overrides (`MESHGATE_CLOUD_HOST`,
/// `MESHGATE_INTERVAL`, ...).
const ENV_PREFIX: &str = "MESHGATE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Transport backend. Only "http" is implemented.
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Watch poll cadence in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,

    pub cloud: CloudSection,
}

/// The registry endpoint and this gateway's cloud credential.
#[derive(Debug, Deserialize, Serialize)]
pub struct CloudSection {
    pub host: String,
    pub port: u16,

    /// Device identifier issued by the registry (36-character UUID form).
    pub uuid: String,

    /// Device secret token (40 characters).
    pub token: String,
}

fn default_protocol() -> String {
    "http".into()
}

fn default_interval() -> u64 {
    10
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load configuration from `path`, then apply environment overrides.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("_"))
        .extract()?;

    config.validate()?;
    Ok(config)
}

impl Config {
    /// Cross-field validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" {
            return Err(ConfigError::Validation {
                field: "protocol".into(),
                reason: format!("unsupported transport {:?} (only \"http\")", self.protocol),
            });
        }
        if self.interval == 0 {
            return Err(ConfigError::Validation {
                field: "interval".into(),
                reason: "poll cadence must be at least one second".into(),
            });
        }
        if self.cloud.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "cloud.host".into(),
                reason: "registry host is required".into(),
            });
        }
        // Width check happens in credential(), but surface it here too so
        // a bad file fails at load rather than first use.
        self.credential()?;
        Ok(())
    }

    /// The gateway's own device credential, width-validated.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        Credential::new(self.cloud.uuid.clone(), self.cloud.token.clone()).map_err(|e| {
            ConfigError::Validation {
                field: "cloud.uuid/token".into(),
                reason: e.to_string(),
            }
        })
    }

    /// Translate into the core session parameters.
    pub fn session(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.cloud.host.clone(), self.cloud.port);
        session.tick = Duration::from_secs(self.interval);
        session
    }
}
