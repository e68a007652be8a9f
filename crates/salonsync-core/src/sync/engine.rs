//! Queue-draining synchronizer.
//!
//! A pass pushes every queued mutation to the remote store in FIFO order,
//! checks updates against the current remote version, then refreshes the
//! local mirror and the collection cache. Passes are single-flight and stop
//! early when connectivity drops.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::conflict;
use super::report::{IdRewrite, NoopObserver, SyncFailure, SyncObserver, SyncOutcome, SyncReport};
use crate::cache::TieredCache;
use crate::clock::{Clock, SystemClock};
use crate::models::{Appointment, Conflict, MutationKind, PendingMutation, RecordId, Resolution};
use crate::remote::{RemoteError, RemoteStore};
use crate::state::SyncState;
use crate::storage::DurableStorage;
use crate::store::LocalRecordStore;
use crate::{Error, Result};

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_COLLECTION_TTL: Duration = Duration::from_secs(10 * 60);

/// Cache key holding the merged appointment collection of `scope`.
pub fn collection_cache_key(scope: &str) -> String {
    format!("appointments:{scope}")
}

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Salon whose collection is refreshed
    pub scope: String,
    /// Period of scheduled passes while online
    pub interval: Duration,
    /// TTL of the refreshed collection in the cache
    pub collection_ttl: Duration,
}

impl SyncConfig {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            interval: DEFAULT_SYNC_INTERVAL,
            collection_ttl: DEFAULT_COLLECTION_TTL,
        }
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn with_collection_ttl(mut self, ttl: Duration) -> Self {
        self.collection_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Push the queue and refresh the collection
    Normal,
    /// Same, but clear the whole cache before refreshing
    Forced,
}

/// Background tasks started by [`SyncEngine::spawn`]
#[derive(Debug)]
pub struct SyncTasks {
    pub scheduler: JoinHandle<()>,
    pub follower: JoinHandle<()>,
}

impl SyncTasks {
    pub fn abort(&self) {
        self.scheduler.abort();
        self.follower.abort();
    }
}

/// Drains the pending queue into the remote store
pub struct SyncEngine<R, S> {
    remote: Arc<R>,
    store: Arc<LocalRecordStore<S>>,
    cache: Arc<TieredCache<S>>,
    state: Arc<SyncState>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn SyncObserver>,
    config: SyncConfig,
    /// Conflicts already handed to the observer, keyed by remote version
    notified: Mutex<HashSet<(RecordId, i64)>>,
}

impl<R: RemoteStore, S: DurableStorage> SyncEngine<R, S> {
    pub fn new(
        remote: Arc<R>,
        store: Arc<LocalRecordStore<S>>,
        cache: Arc<TieredCache<S>>,
        state: Arc<SyncState>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            store,
            cache,
            state,
            clock: Arc::new(SystemClock),
            observer: Arc::new(NoopObserver),
            config,
            notified: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub const fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    pub const fn store(&self) -> &Arc<LocalRecordStore<S>> {
        &self.store
    }

    pub const fn cache(&self) -> &Arc<TieredCache<S>> {
        &self.cache
    }

    /// Apply a connectivity reading; returns true on an offline to online transition.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.state.set_online(online);
        if was_online != online {
            tracing::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
        online && !was_online
    }

    /// Run one pass unless another is in progress or the device is offline.
    pub async fn sync(&self, mode: SyncMode) -> SyncOutcome {
        let Some(_guard) = self.state.try_begin_sync() else {
            tracing::debug!("Sync already in progress, skipping");
            return SyncOutcome::Skipped;
        };
        if !self.state.is_online() {
            return SyncOutcome::Offline;
        }

        let report = self.run_pass(mode).await;
        tracing::info!(
            "Sync pass finished: {} pushed, {} conflicts, {} failures{}",
            report.pushed(),
            report.conflicts.len(),
            report.failures.len(),
            if report.aborted { " (aborted)" } else { "" }
        );
        self.observer.on_synced(&report);
        SyncOutcome::Completed(report)
    }

    /// Apply a decision for `conflict`; returns the record now mirrored locally.
    ///
    /// Keeping the local version re-queues it rebased on the remote timestamp
    /// and pushes it right away when online. A failed push leaves it queued.
    pub async fn resolve(&self, conflict: &Conflict, resolution: Resolution) -> Appointment {
        let record = self.apply_resolution(conflict, resolution).await;
        if !record.pending_sync || !self.state.is_online() {
            return record;
        }

        let Some(mutation) = self.queued(&record.id).await else {
            return record;
        };
        match self.remote.update(&mutation.record_id, &mutation.payload).await {
            Ok(()) => {
                self.store.settle(&mutation).await;
                self.cache
                    .remove(&collection_cache_key(&self.config.scope))
                    .await;
            }
            Err(error) => {
                tracing::warn!("Pushing resolved record {} failed: {error}", record.id);
            }
        }
        self.store.get(&record.id).await.unwrap_or(record)
    }

    /// Resolve the queued conflict for `id` against a freshly fetched remote version.
    pub async fn resolve_by_id(&self, id: &RecordId, resolution: Resolution) -> Result<Appointment> {
        let mutation = self
            .queued(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("No pending change for {id}")))?;
        let remote = self
            .remote
            .fetch(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{id} does not exist on the server")))?;

        let conflict = Conflict {
            local: mutation.payload,
            remote,
        };
        Ok(self.resolve(&conflict, resolution).await)
    }

    async fn run_pass(&self, mode: SyncMode) -> SyncReport {
        let mut report = SyncReport::default();
        let pending = self.store.list_pending().await;
        tracing::debug!("Sync pass started with {} queued mutations", pending.len());

        for mutation in pending {
            if !self.state.is_online() {
                report.aborted = true;
                break;
            }
            match mutation.kind {
                MutationKind::Create => {
                    self.push_create(&mutation, &mut report).await;
                }
                MutationKind::Update => {
                    self.push_update(&mutation, &mut report).await;
                }
            }
        }

        if report.aborted || !self.state.is_online() {
            report.aborted = true;
            tracing::info!("Connectivity lost, sync pass aborted");
            return report;
        }

        self.forget_settled_conflicts(&report).await;
        self.refresh(mode, &mut report).await;
        if report.refreshed {
            self.state.record_sync(self.clock.now_millis());
        }
        report
    }

    async fn push_create(&self, mutation: &PendingMutation, report: &mut SyncReport) {
        match self.remote.create(&mutation.payload).await {
            Ok(server_id) => {
                self.store
                    .replace_provisional(mutation, server_id.clone())
                    .await;
                tracing::debug!("Created {} as {server_id}", mutation.record_id);
                report.created.push(IdRewrite {
                    provisional: mutation.record_id.clone(),
                    server: server_id,
                });
            }
            Err(error) => self.record_failure(mutation, &error, report),
        }
    }

    async fn push_update(&self, mutation: &PendingMutation, report: &mut SyncReport) {
        let remote = match self.remote.fetch(&mutation.record_id).await {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                let error = RemoteError::Rejected(format!(
                    "{} no longer exists on the server",
                    mutation.record_id
                ));
                self.record_failure(mutation, &error, report);
                return;
            }
            Err(error) => {
                self.record_failure(mutation, &error, report);
                return;
            }
        };

        if let Some(conflict) = conflict::detect(&mutation.payload, &remote) {
            report.conflicts.push(conflict.clone());
            if !self.first_sighting(&conflict).await {
                tracing::debug!("Conflict on {} still unresolved", mutation.record_id);
                return;
            }
            tracing::warn!("Conflict on {}, left queued", mutation.record_id);
            if let Some(resolution) = self.observer.on_conflict(&conflict) {
                let record = self.apply_resolution(&conflict, resolution).await;
                report.resolved.push(record.id.clone());
                if let Some(rebased) = self.queued(&record.id).await {
                    self.write_update(&rebased, report).await;
                }
            }
            return;
        }

        self.write_update(mutation, report).await;
    }

    async fn write_update(&self, mutation: &PendingMutation, report: &mut SyncReport) {
        match self
            .remote
            .update(&mutation.record_id, &mutation.payload)
            .await
        {
            Ok(()) => {
                self.store.settle(mutation).await;
                tracing::debug!("Updated {}", mutation.record_id);
                report.updated.push(mutation.record_id.clone());
            }
            Err(error) => self.record_failure(mutation, &error, report),
        }
    }

    async fn apply_resolution(&self, conflict: &Conflict, resolution: Resolution) -> Appointment {
        tracing::info!("Resolving conflict on {} with {resolution:?}", conflict.record_id());
        self.notified
            .lock()
            .await
            .retain(|(id, _)| id != conflict.record_id());
        match resolution {
            Resolution::KeepRemote => {
                let record = conflict.remote.clone().into_synced();
                self.store.confirm(record.clone()).await;
                record
            }
            Resolution::KeepLocal => {
                let now = self.clock.now_millis();
                let mut rebased = conflict.local.clone();
                rebased.id = conflict.remote.id.clone();
                rebased.base_updated_at = Some(conflict.remote.updated_at);
                rebased.updated_at = now.max(conflict.remote.updated_at + 1);
                rebased.pending_sync = true;
                self.store
                    .stage(PendingMutation::update(rebased.clone(), now))
                    .await;
                rebased
            }
        }
    }

    async fn refresh(&self, mode: SyncMode, report: &mut SyncReport) {
        let key = collection_cache_key(&self.config.scope);
        if mode == SyncMode::Forced {
            self.cache.clear_all().await;
        }

        match self.remote.fetch_collection(&self.config.scope).await {
            Ok(records) => {
                self.store.adopt_remote(records).await;
                let merged = self.store.load_all().await;
                self.cache
                    .set(&key, &merged, self.config.collection_ttl)
                    .await;
                report.refreshed = true;
            }
            Err(error) => {
                tracing::warn!("Refreshing {} failed: {error}", self.config.scope);
                self.cache.remove(&key).await;
            }
        }
    }

    /// Whether `conflict` is new for its remote version; records it if so.
    async fn first_sighting(&self, conflict: &Conflict) -> bool {
        self.notified
            .lock()
            .await
            .insert((conflict.record_id().clone(), conflict.remote.updated_at))
    }

    /// Drop remembered conflicts that a full pass no longer saw.
    async fn forget_settled_conflicts(&self, report: &SyncReport) {
        self.notified.lock().await.retain(|(id, remote_at)| {
            report
                .conflicts
                .iter()
                .any(|c| c.record_id() == id && c.remote.updated_at == *remote_at)
        });
    }

    async fn queued(&self, id: &RecordId) -> Option<PendingMutation> {
        self.store
            .list_pending()
            .await
            .into_iter()
            .find(|mutation| &mutation.record_id == id)
    }

    fn record_failure(&self, mutation: &PendingMutation, error: &RemoteError, report: &mut SyncReport) {
        let transient = error.is_transient();
        if transient {
            tracing::debug!("{} stays queued: {error}", mutation.record_id);
        } else {
            tracing::warn!("{} was rejected: {error}", mutation.record_id);
            self.observer.on_rejected(mutation, error);
        }
        report.failures.push(SyncFailure {
            record_id: mutation.record_id.clone(),
            reason: error.to_string(),
            transient,
        });
    }
}

impl<R, S> SyncEngine<R, S>
where
    R: RemoteStore + 'static,
    S: DurableStorage + 'static,
{
    /// Start the scheduled pass loop and the connectivity follower.
    ///
    /// Passes triggered by reconnection run as their own tasks so a later
    /// offline reading can stop them part way.
    pub fn spawn(self: &Arc<Self>, mut connectivity: watch::Receiver<bool>) -> SyncTasks {
        let engine = Arc::clone(self);
        let period = self.config.interval;
        let scheduler = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if engine.state.is_online() {
                    engine.sync(SyncMode::Normal).await;
                }
            }
        });

        let engine = Arc::clone(self);
        let follower = tokio::spawn(async move {
            let mut online = *connectivity.borrow_and_update();
            loop {
                if engine.set_online(online) {
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move {
                        engine.sync(SyncMode::Normal).await;
                    });
                }
                if connectivity.changed().await.is_err() {
                    break;
                }
                online = *connectivity.borrow_and_update();
            }
        });

        SyncTasks {
            scheduler,
            follower,
        }
    }
}
