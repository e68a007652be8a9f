//! Durable key-value storage shared by the cache and the local record store.

mod memory;

use std::future::Future;

pub use memory::MemoryStorage;

use crate::Result;

/// Crash-safe key-value storage.
///
/// A single write either fully lands or is absent; nothing is transactional
/// across keys.
pub trait DurableStorage: Send + Sync {
    /// Read the bytes stored under `key`.
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// List every key starting with `prefix`, sorted ascending.
    fn list_keys(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>>> + Send;
}
