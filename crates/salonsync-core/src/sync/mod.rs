//! Synchronization: conflict detection, the queue-draining engine and the
//! connectivity monitor that drives it.

pub mod conflict;
mod connectivity;
mod engine;
mod report;

pub use connectivity::{ConnectivityConfig, ConnectivityMonitor};
pub use engine::{collection_cache_key, SyncConfig, SyncEngine, SyncMode, SyncTasks};
pub use report::{
    IdRewrite, NoopObserver, SyncEvent, SyncFailure, SyncObserver, SyncOutcome, SyncReport,
};
