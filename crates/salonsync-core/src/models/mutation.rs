//! Pending mutation model

use serde::{Deserialize, Serialize};

use super::{Appointment, RecordId};

/// What the queued mutation asks the remote store to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
}

/// A locally made change awaiting confirmation from the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub record_id: RecordId,
    pub kind: MutationKind,
    pub payload: Appointment,
    /// Enqueue time (Unix ms)
    pub enqueued_at: i64,
}

impl PendingMutation {
    pub fn create(payload: Appointment, enqueued_at: i64) -> Self {
        Self {
            record_id: payload.id.clone(),
            kind: MutationKind::Create,
            payload,
            enqueued_at,
        }
    }

    pub fn update(payload: Appointment, enqueued_at: i64) -> Self {
        Self {
            record_id: payload.id.clone(),
            kind: MutationKind::Update,
            payload,
            enqueued_at,
        }
    }

    /// Merge a newer mutation for the same record into this queued one.
    ///
    /// The newer payload wins. A queued create stays a create because the
    /// server has never seen the record.
    #[must_use]
    pub fn superseded_by(&self, newer: Self) -> Self {
        let kind = if self.kind == MutationKind::Create {
            MutationKind::Create
        } else {
            newer.kind
        };
        Self { kind, ..newer }
    }
}
