//! Tiered cache: an in-process map in front of durable key-value storage.
//!
//! Reads check the in-process tier, then the durable tier (promoting valid
//! hits). Writes go through to both. The cache is a best-effort accelerator:
//! storage faults are logged and surface as misses, never as errors.

mod entry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub use entry::{CacheEntry, KeyPattern};

use crate::clock::Clock;
use crate::storage::DurableStorage;

/// Schema tag stamped on every entry; bump to lazily invalidate old entries.
pub const CACHE_SCHEMA_VERSION: &str = "1";

/// Namespace of cache entries inside the shared durable storage.
const DURABLE_PREFIX: &str = "cache:";

const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Tiered cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub schema_version: String,
    /// Interval of the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schema_version: CACHE_SCHEMA_VERSION.to_string(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Two-tier cache with TTL expiry and schema versioning
pub struct TieredCache<S> {
    memory: Mutex<HashMap<String, CacheEntry>>,
    durable: Arc<S>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<S: DurableStorage> TieredCache<S> {
    pub fn new(durable: Arc<S>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            durable,
            clock,
            config,
        }
    }

    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up `key`, returning `None` on a miss, an invalid entry, or a storage fault.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_millis();
        let mut memory = self.memory.lock().await;

        if let Some(entry) = memory.get(key) {
            if entry.is_valid(&self.config.schema_version, now) {
                if let Some(value) = decode_data(entry) {
                    return Some(value);
                }
            }
            memory.remove(key);
        }

        let entry = self.read_durable(key).await?;
        if !entry.is_valid(&self.config.schema_version, now) {
            self.delete_durable(key).await;
            return None;
        }

        let value = decode_data(&entry)?;
        tracing::debug!("Promoted cache entry {key} into memory tier");
        memory.insert(key.to_string(), entry);
        Some(value)
    }

    /// Write `value` under `key` to both tiers.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!("Skipping cache write for {key}: {error}");
                return;
            }
        };

        let entry = CacheEntry {
            key: key.to_string(),
            data,
            timestamp: self.clock.now_millis(),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            schema_version: self.config.schema_version.clone(),
        };

        let mut memory = self.memory.lock().await;
        match serde_json::to_vec(&entry) {
            Ok(bytes) => {
                if let Err(error) = self.durable.write(&durable_key(key), &bytes).await {
                    tracing::warn!("Durable cache write failed for {key}: {error}");
                }
            }
            Err(error) => tracing::warn!("Failed to encode cache entry {key}: {error}"),
        }
        memory.insert(key.to_string(), entry);
    }

    /// Delete `key` from both tiers.
    pub async fn remove(&self, key: &str) {
        let mut memory = self.memory.lock().await;
        memory.remove(key);
        self.delete_durable(key).await;
    }

    /// Delete every entry whose key matches `pattern`; returns how many keys were dropped.
    pub async fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut memory = self.memory.lock().await;
        let mut removed = Vec::new();

        memory.retain(|key, _| {
            if pattern.matches(key) {
                removed.push(key.clone());
                false
            } else {
                true
            }
        });

        for key in self.durable_keys().await {
            if pattern.matches(&key) {
                self.delete_durable(&key).await;
                if !removed.contains(&key) {
                    removed.push(key);
                }
            }
        }

        tracing::debug!("Invalidated {} cache entries", removed.len());
        removed.len()
    }

    /// Drop every entry from both tiers.
    pub async fn clear_all(&self) {
        let mut memory = self.memory.lock().await;
        memory.clear();
        for key in self.durable_keys().await {
            self.delete_durable(&key).await;
        }
        tracing::info!("Cache cleared");
    }

    /// Evict every invalid entry from both tiers; returns the number of evictions.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let schema_version = self.config.schema_version.as_str();
        let mut memory = self.memory.lock().await;

        let before = memory.len();
        memory.retain(|_, entry| entry.is_valid(schema_version, now));
        let mut evicted = before - memory.len();

        for key in self.durable_keys().await {
            let valid = self
                .read_durable(&key)
                .await
                .is_some_and(|entry| entry.is_valid(schema_version, now));
            if !valid {
                self.delete_durable(&key).await;
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::debug!("Cache cleanup evicted {evicted} entries");
        }
        evicted
    }

    /// Number of entries currently held in the in-process tier.
    pub async fn memory_len(&self) -> usize {
        self.memory.lock().await.len()
    }

    async fn read_durable(&self, key: &str) -> Option<CacheEntry> {
        match self.durable.read(&durable_key(key)).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<CacheEntry>(&bytes) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!("Discarding undecodable cache entry {key}: {error}");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!("Durable cache read failed for {key}: {error}");
                None
            }
        }
    }

    async fn delete_durable(&self, key: &str) {
        if let Err(error) = self.durable.delete(&durable_key(key)).await {
            tracing::warn!("Durable cache delete failed for {key}: {error}");
        }
    }

    async fn durable_keys(&self) -> Vec<String> {
        match self.durable.list_keys(DURABLE_PREFIX).await {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|key| key.strip_prefix(DURABLE_PREFIX).map(str::to_string))
                .collect(),
            Err(error) => {
                tracing::warn!("Durable cache listing failed: {error}");
                Vec::new()
            }
        }
    }
}

impl<S: DurableStorage + 'static> TieredCache<S> {
    /// Run `cleanup` every `cleanup_interval` until the returned task is aborted.
    pub fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let period = cache.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.cleanup().await;
            }
        })
    }
}

fn durable_key(key: &str) -> String {
    format!("{DURABLE_PREFIX}{key}")
}

fn decode_data<T: DeserializeOwned>(entry: &CacheEntry) -> Option<T> {
    match serde_json::from_value(entry.data.clone()) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!("Cached value {} has unexpected shape: {error}", entry.key);
            None
        }
    }
}
