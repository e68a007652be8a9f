//! Remote store interface consumed by the sync engine.

mod http;

use std::future::Future;

use thiserror::Error;

pub use http::HttpRemoteStore;

use crate::models::{Appointment, RecordId};

/// Failures the remote store can surface.
///
/// `Unreachable` is transient and retried on the next pass; `Rejected` means
/// the server refused the request and no automatic recovery is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),
    #[error("Remote store rejected the request: {0}")]
    Rejected(String),
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
}

impl RemoteError {
    /// Whether the failure is worth retrying on a later pass.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Networked collection store, reachable only while online.
pub trait RemoteStore: Send + Sync {
    /// Fetch every appointment in `scope` (a salon id).
    fn fetch_collection(
        &self,
        scope: &str,
    ) -> impl Future<Output = RemoteResult<Vec<Appointment>>> + Send;

    /// Fetch one appointment; `None` when the server has no such record.
    fn fetch(&self, id: &RecordId) -> impl Future<Output = RemoteResult<Option<Appointment>>> + Send;

    /// Create a record and return its server-assigned id.
    fn create(&self, record: &Appointment) -> impl Future<Output = RemoteResult<RecordId>> + Send;

    /// Replace the record stored under `id`.
    fn update(
        &self,
        id: &RecordId,
        record: &Appointment,
    ) -> impl Future<Output = RemoteResult<()>> + Send;
}

/// Cheap check of whether the remote side can currently be reached.
pub trait ReachabilityProbe: Send + Sync {
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;
}
