//! Appointment record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix reserved for client-minted ids of records the server has not seen yet.
pub const PROVISIONAL_ID_PREFIX: &str = "local-";

/// Identifier of a record: server-assigned, or provisional (`local-...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a server-assigned (or already known) identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a new provisional id for a record created while offline.
    ///
    /// Uses UUID v7 so provisional ids sort by creation time.
    #[must_use]
    pub fn provisional() -> Self {
        Self(format!("{PROVISIONAL_ID_PREFIX}{}", Uuid::now_v7().simple()))
    }

    /// Whether this id was minted locally and not yet confirmed by the server.
    pub fn is_provisional(&self) -> bool {
        self.0.starts_with(PROVISIONAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Record id cannot be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

/// How the appointment was (or will be) paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

/// Business fields of an appointment.
///
/// The sync layer never inspects these; it only compares and replaces them as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub client_name: String,
    pub service: String,
    /// Start of the time window (Unix ms)
    pub starts_at: i64,
    /// End of the time window (Unix ms)
    pub ends_at: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An appointment as mirrored on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Server id, or a provisional id while unsynced
    pub id: RecordId,
    /// Salon (scope) the appointment belongs to
    pub owner_id: String,
    #[serde(flatten)]
    pub details: AppointmentDetails,
    /// Logical write timestamp of the last writer (Unix ms)
    pub updated_at: i64,
    /// Remote `updated_at` this local version was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_updated_at: Option<i64>,
    /// True while a queued mutation awaits confirmation
    #[serde(default)]
    pub pending_sync: bool,
}

impl Appointment {
    /// Create a new, never-synced appointment with a provisional id.
    pub fn new_local(owner_id: impl Into<String>, details: AppointmentDetails, now: i64) -> Self {
        Self {
            id: RecordId::provisional(),
            owner_id: owner_id.into(),
            details,
            updated_at: now,
            base_updated_at: None,
            pending_sync: true,
        }
    }

    /// Produce a locally edited copy based on this version.
    ///
    /// The baseline is kept from a previous unsynced edit so that a chain of
    /// offline edits is still compared against the last remote state seen.
    #[must_use]
    pub fn edited(&self, details: AppointmentDetails, now: i64) -> Self {
        let base_updated_at = if self.pending_sync {
            self.base_updated_at
        } else {
            Some(self.updated_at)
        };
        Self {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            details,
            updated_at: now,
            base_updated_at,
            pending_sync: true,
        }
    }

    /// Mark this copy as confirmed by the remote store.
    #[must_use]
    pub fn into_synced(mut self) -> Self {
        self.base_updated_at = Some(self.updated_at);
        self.pending_sync = false;
        self
    }

    /// Whether both versions carry the same business content.
    pub fn same_content(&self, other: &Self) -> bool {
        self.owner_id == other.owner_id && self.details == other.details
    }
}
