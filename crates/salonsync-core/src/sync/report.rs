//! Results of a sync pass and the observer hooks that surface them.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::{Conflict, PendingMutation, RecordId, Resolution};
use crate::remote::RemoteError;

/// Outcome of a sync request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A pass ran (possibly aborted part way)
    Completed(SyncReport),
    /// Another pass was already running
    Skipped,
    /// The remote store is not reachable
    Offline,
}

impl SyncOutcome {
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped | Self::Offline => None,
        }
    }
}

/// A provisional id that the server replaced on create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRewrite {
    pub provisional: RecordId,
    pub server: RecordId,
}

/// A queued mutation that could not be pushed and stays queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub record_id: RecordId,
    pub reason: String,
    /// Retried automatically on the next pass
    pub transient: bool,
}

/// What one sync pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: Vec<IdRewrite>,
    pub updated: Vec<RecordId>,
    pub conflicts: Vec<Conflict>,
    /// Conflicts resolved by the observer during the pass
    pub resolved: Vec<RecordId>,
    pub failures: Vec<SyncFailure>,
    /// Whether the collection was re-fetched into the store and cache
    pub refreshed: bool,
    /// Connectivity was lost before the pass finished
    pub aborted: bool,
}

impl SyncReport {
    /// Number of mutations the remote store accepted.
    pub fn pushed(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Receives conflicts, rejections and pass summaries from the sync engine.
///
/// Callbacks run on the syncing task and must not block.
pub trait SyncObserver: Send + Sync {
    /// A pending edit collides with a newer remote version.
    ///
    /// Returning a resolution applies it immediately; `None` leaves the
    /// mutation queued until [`SyncEngine::resolve`](super::SyncEngine::resolve) is called.
    fn on_conflict(&self, conflict: &Conflict) -> Option<Resolution> {
        let _ = conflict;
        None
    }

    /// The remote store refused a mutation. It stays queued.
    fn on_rejected(&self, mutation: &PendingMutation, error: &RemoteError) {
        let _ = (mutation, error);
    }

    /// A pass finished.
    fn on_synced(&self, report: &SyncReport) {
        let _ = report;
    }
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Notification forwarded over a channel by the channel observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Conflict(Conflict),
    Rejected { record_id: RecordId, reason: String },
    Synced(SyncReport),
}

impl SyncObserver for UnboundedSender<SyncEvent> {
    fn on_conflict(&self, conflict: &Conflict) -> Option<Resolution> {
        if self.send(SyncEvent::Conflict(conflict.clone())).is_err() {
            tracing::debug!("Conflict listener is gone");
        }
        None
    }

    fn on_rejected(&self, mutation: &PendingMutation, error: &RemoteError) {
        let event = SyncEvent::Rejected {
            record_id: mutation.record_id.clone(),
            reason: error.to_string(),
        };
        if self.send(event).is_err() {
            tracing::debug!("Rejection listener is gone");
        }
    }

    fn on_synced(&self, report: &SyncReport) {
        if self.send(SyncEvent::Synced(report.clone())).is_err() {
            tracing::debug!("Sync summary listener is gone");
        }
    }
}
