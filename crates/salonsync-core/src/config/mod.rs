//! Client configuration.
//!
//! `ClientConfig` is read from a JSON file, overridden by `SALONSYNC_*`
//! environment variables, validated, and then split into the per-component
//! configs of the cache, the sync engine and the connectivity monitor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, CACHE_SCHEMA_VERSION};
use crate::sync::{ConnectivityConfig, SyncConfig};
use crate::util::{has_http_scheme, non_blank};
use crate::{Error, Result};

const ENV_PREFIX: &str = "SALONSYNC_";

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_connectivity_interval_secs() -> u64 {
    5
}

fn default_cache_cleanup_interval_secs() -> u64 {
    5 * 60
}

fn default_appointments_ttl_secs() -> u64 {
    10 * 60
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_schema_version() -> String {
    CACHE_SCHEMA_VERSION.to_string()
}

/// Settings of one salonsync client installation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the salon backend, e.g. `https://api.example.com`
    #[serde(default)]
    pub api_base_url: String,
    /// Salon whose appointments are mirrored
    #[serde(default)]
    pub salon_id: String,
    /// Local database file; the CLI picks a per-user default when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_connectivity_interval_secs")]
    pub connectivity_interval_secs: u64,
    #[serde(default = "default_cache_cleanup_interval_secs")]
    pub cache_cleanup_interval_secs: u64,
    #[serde(default = "default_appointments_ttl_secs")]
    pub appointments_ttl_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Cache schema tag; changing it invalidates every cached entry
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            salon_id: String::new(),
            db_path: None,
            sync_interval_secs: default_sync_interval_secs(),
            connectivity_interval_secs: default_connectivity_interval_secs(),
            cache_cleanup_interval_secs: default_cache_cleanup_interval_secs(),
            appointments_ttl_secs: default_appointments_ttl_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            schema_version: default_schema_version(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("Invalid config file: {error}")))
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Apply `SALONSYNC_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            lookup(&format!("{ENV_PREFIX}{suffix}")).and_then(|value| non_blank(&value))
        };

        if let Some(value) = var("API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Some(value) = var("SALON_ID") {
            self.salon_id = value;
        }
        if let Some(value) = var("DB_PATH") {
            self.db_path = Some(PathBuf::from(value));
        }
        if let Some(value) = var("SCHEMA_VERSION") {
            self.schema_version = value;
        }

        let seconds = [
            ("SYNC_INTERVAL_SECS", &mut self.sync_interval_secs),
            ("CONNECTIVITY_INTERVAL_SECS", &mut self.connectivity_interval_secs),
            ("CACHE_CLEANUP_INTERVAL_SECS", &mut self.cache_cleanup_interval_secs),
            ("APPOINTMENTS_TTL_SECS", &mut self.appointments_ttl_secs),
            ("HTTP_TIMEOUT_SECS", &mut self.http_timeout_secs),
        ];
        for (suffix, field) in seconds {
            if let Some(value) = var(suffix) {
                *field = value.parse().map_err(|_| {
                    Error::Config(format!("{ENV_PREFIX}{suffix} must be a whole number of seconds"))
                })?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.api_base_url.trim();
        if base_url.is_empty() {
            return Err(Error::Config("api_base_url is required".to_string()));
        }
        if !has_http_scheme(base_url) {
            return Err(Error::Config(
                "api_base_url must include http:// or https://".to_string(),
            ));
        }
        if self.salon_id.trim().is_empty() {
            return Err(Error::Config("salon_id is required".to_string()));
        }
        if self.schema_version.trim().is_empty() {
            return Err(Error::Config("schema_version must not be empty".to_string()));
        }

        let intervals = [
            ("sync_interval_secs", self.sync_interval_secs),
            ("connectivity_interval_secs", self.connectivity_interval_secs),
            ("cache_cleanup_interval_secs", self.cache_cleanup_interval_secs),
            ("appointments_ttl_secs", self.appointments_ttl_secs),
            ("http_timeout_secs", self.http_timeout_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("{name} must be greater than zero")));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            schema_version: self.schema_version.clone(),
            cleanup_interval: Duration::from_secs(self.cache_cleanup_interval_secs),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.salon_id.clone())
            .with_interval(Duration::from_secs(self.sync_interval_secs))
            .with_collection_ttl(Duration::from_secs(self.appointments_ttl_secs))
    }

    pub const fn connectivity_config(&self) -> ConnectivityConfig {
        ConnectivityConfig {
            interval: Duration::from_secs(self.connectivity_interval_secs),
        }
    }

    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
