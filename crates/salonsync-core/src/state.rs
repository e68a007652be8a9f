//! Process-wide sync state shared by the engine, monitor and clients.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use serde::Serialize;

const NEVER_SYNCED: i64 = i64::MIN;

/// Coarse sync status for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Offline,
    Syncing,
    Idle,
}

/// Shared `online` / `syncing` flags and the time of the last completed pass
#[derive(Debug)]
pub struct SyncState {
    online: AtomicBool,
    syncing: AtomicBool,
    last_sync_at: AtomicI64,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SyncState {
    pub const fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            syncing: AtomicBool::new(false),
            last_sync_at: AtomicI64::new(NEVER_SYNCED),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Set reachability; returns the previous value.
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst)
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Try to take the single-flight guard without waiting.
    ///
    /// Returns `None` when another pass already holds it.
    pub fn try_begin_sync(&self) -> Option<SyncGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncGuard { state: self })
    }

    pub fn last_sync_at(&self) -> Option<i64> {
        match self.last_sync_at.load(Ordering::SeqCst) {
            NEVER_SYNCED => None,
            value => Some(value),
        }
    }

    pub fn record_sync(&self, at_millis: i64) {
        self.last_sync_at.store(at_millis, Ordering::SeqCst);
    }

    pub fn phase(&self) -> SyncPhase {
        if self.is_syncing() {
            SyncPhase::Syncing
        } else if self.is_online() {
            SyncPhase::Idle
        } else {
            SyncPhase::Offline
        }
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            online: self.is_online(),
            syncing: self.is_syncing(),
            last_sync_at: self.last_sync_at(),
            phase: self.phase(),
        }
    }
}

/// Releases the `syncing` flag when dropped
#[derive(Debug)]
pub struct SyncGuard<'a> {
    state: &'a SyncState,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.state.syncing.store(false, Ordering::SeqCst);
    }
}

/// Point-in-time copy of `SyncState`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub online: bool,
    pub syncing: bool,
    pub last_sync_at: Option<i64>,
    pub phase: SyncPhase,
}
