//! Runtime configuration for embedding hosts and the CLI.
//!
//! # Invariants
//! - Every field has a default, so partial documents deserialize.
//! - `from_env` never panics; malformed values are reported as errors.

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "ATLAS_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "ATLAS_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "ATLAS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ATLAS_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Database file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds a config from `ATLAS_*` environment variables over defaults.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = non_empty(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = non_empty(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = raw
                .trim()
                .parse()
                .map_err(|err| format!("invalid {ENV_BUSY_TIMEOUT_MS} `{raw}`: {err}"))?;
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = non_empty(ENV_LOG_DIR);

        Ok(config)
    }
}
