//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::{Appointment, RecordId};

/// A pending local version and a newer remote version of the same record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Unsynced local version
    pub local: Appointment,
    /// Current server version
    pub remote: Appointment,
}

impl Conflict {
    pub const fn record_id(&self) -> &RecordId {
        &self.local.id
    }
}

/// Explicit user decision for a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Overwrite the remote version with the local payload
    KeepLocal,
    /// Drop the local change and adopt the remote version
    KeepRemote,
}
