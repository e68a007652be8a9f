//! Write-write conflict detection between a pending local edit and the
//! current remote version of the same record.

use crate::models::{Appointment, Conflict};

/// Compare a pending local record with its remote counterpart.
///
/// The local edit was based on `base_updated_at` (or its own `updated_at`
/// when no baseline was captured). If the remote copy was written after that
/// baseline and the two versions differ, overwriting would discard the remote
/// change, so the pair is returned for a manual decision. Nothing is resolved
/// here.
pub fn detect(local: &Appointment, remote: &Appointment) -> Option<Conflict> {
    let baseline = local.base_updated_at.unwrap_or(local.updated_at);
    if remote.updated_at <= baseline {
        return None;
    }
    if local.same_content(remote) {
        return None;
    }

    Some(Conflict {
        local: local.clone(),
        remote: remote.clone(),
    })
}
