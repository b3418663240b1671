//! # Service Configuration
//!
//! TOML configuration for the NGAO service.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [storage]
//! backend = "redb"        # or "memory"
//! path = "ngao.redb"
//!
//! [security]
//! api_key = "change-me"
//! rate_limit = 100        # requests per second, 0 disables
//! cors_origins = "https://mis.example.go.ke"
//!
//! [permissions]
//! chief = ["incidents.*", "registrations.view"]
//! ```
//!
//! `NGAO_API_KEY`, `NGAO_RATE_LIMIT` and `NGAO_CORS_ORIGINS` override the
//! `[security]` section.

use crate::delivery::TracingSink;
use ngao_core::{Engine, NgaoError, PermissionTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Largest config file accepted.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
    /// Role slug → grant strings, replacing the built-in grants of that role.
    pub permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    #[default]
    Redb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: Backend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Redb,
            path: PathBuf::from("ngao.redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Required bearer token. Authentication is off when unset or empty.
    pub api_key: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Comma-separated origins, or `*`. Localhost only when unset.
    pub cors_origins: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit: 100,
            cors_origins: None,
        }
    }
}

impl SecurityConfig {
    /// The API key when authentication is enabled.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn parse(text: &str) -> Result<Self, NgaoError> {
        toml::from_str(text).map_err(|e| NgaoError::Validation(format!("invalid config: {e}")))
    }

    /// Read `path`, or start from defaults when no file is given, then apply
    /// the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, NgaoError> {
        let config = match path {
            Some(path) => {
                let metadata = std::fs::metadata(path).map_err(|e| {
                    NgaoError::Storage(format!("cannot read config '{}': {e}", path.display()))
                })?;
                if metadata.len() > MAX_CONFIG_FILE_SIZE {
                    return Err(NgaoError::Validation(format!(
                        "config file size {} bytes exceeds maximum {MAX_CONFIG_FILE_SIZE} bytes",
                        metadata.len()
                    )));
                }
                let text = std::fs::read_to_string(path).map_err(|e| {
                    NgaoError::Storage(format!("cannot read config '{}': {e}", path.display()))
                })?;
                Self::parse(&text)?
            }
            None => Self::default(),
        };
        config.with_env(|name| std::env::var(name).ok())
    }

    /// Apply `NGAO_*` overrides looked up through `var`.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, NgaoError> {
        if let Some(key) = var("NGAO_API_KEY") {
            self.security.api_key = Some(key);
        }
        if let Some(limit) = var("NGAO_RATE_LIMIT") {
            self.security.rate_limit = limit.trim().parse().map_err(|_| {
                NgaoError::Validation(format!("NGAO_RATE_LIMIT must be a number, got '{limit}'"))
            })?;
        }
        if let Some(origins) = var("NGAO_CORS_ORIGINS") {
            self.security.cors_origins = Some(origins);
        }
        Ok(self)
    }

    /// Built-in permission table with the `[permissions]` overrides applied.
    pub fn permission_table(&self) -> Result<PermissionTable, NgaoError> {
        PermissionTable::builtin().with_overrides(
            self.permissions
                .iter()
                .map(|(role, grants)| (role.as_str(), grants.as_slice())),
        )
    }

    /// Open the configured storage and wire permissions and delivery.
    pub fn open_engine(&self) -> Result<Engine, NgaoError> {
        let engine = match self.storage.backend {
            Backend::Memory => Engine::new(),
            Backend::Redb => Engine::with_redb(&self.storage.path)?,
        };
        Ok(engine
            .with_permissions(self.permission_table()?)
            .with_sink(TracingSink))
    }
}
