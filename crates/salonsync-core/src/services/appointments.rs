//! Read/write path used by the UI layer.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::models::{Appointment, AppointmentDetails, PendingMutation, RecordId};
use crate::remote::{RemoteError, RemoteStore};
use crate::state::SyncSnapshot;
use crate::storage::DurableStorage;
use crate::sync::{collection_cache_key, SyncEngine};
use crate::{Error, Result};

/// Appointment reads through the cache and writes that degrade to the queue
pub struct AppointmentService<R, S> {
    remote: Arc<R>,
    engine: Arc<SyncEngine<R, S>>,
    clock: Arc<dyn Clock>,
}

impl<R: RemoteStore, S: DurableStorage> AppointmentService<R, S> {
    pub fn new(remote: Arc<R>, engine: Arc<SyncEngine<R, S>>) -> Self {
        Self {
            remote,
            engine,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn scope(&self) -> &str {
        &self.engine.config().scope
    }

    /// Appointments of the configured salon ordered by start time.
    ///
    /// Served from the cache when possible. A miss queries the remote store
    /// and fills both the cache and the local mirror; while offline, or if the
    /// query fails, the local mirror is returned.
    pub async fn list(&self) -> Vec<Appointment> {
        let key = collection_cache_key(self.scope());
        let cache = self.engine.cache();
        if let Some(records) = cache.get::<Vec<Appointment>>(&key).await {
            return sorted(records);
        }

        let store = self.engine.store();
        if self.engine.state().is_online() {
            match self.remote.fetch_collection(self.scope()).await {
                Ok(records) => {
                    store.adopt_remote(records).await;
                    let merged = store.load_all().await;
                    cache
                        .set(&key, &merged, self.engine.config().collection_ttl)
                        .await;
                    return sorted(merged);
                }
                Err(error) => {
                    tracing::warn!("Live appointment query failed, using local copy: {error}");
                }
            }
        }
        sorted(store.load_all().await)
    }

    pub async fn get(&self, id: &RecordId) -> Result<Appointment> {
        self.engine
            .store()
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Create an appointment, directly when online and queued otherwise.
    pub async fn create(&self, details: AppointmentDetails) -> Result<Appointment> {
        let now = self.clock.now_millis();
        let record = Appointment::new_local(self.scope(), details, now);

        if self.engine.state().is_online() {
            match self.remote.create(&record).await {
                Ok(server_id) => {
                    let mut synced = record.into_synced();
                    synced.id = server_id;
                    self.engine.store().confirm(synced.clone()).await;
                    self.invalidate_collection().await;
                    return Ok(synced);
                }
                Err(error) => self.degrade(error)?,
            }
        }

        self.engine
            .store()
            .stage(PendingMutation::create(record.clone(), now))
            .await;
        self.invalidate_collection().await;
        tracing::debug!("Queued create of {}", record.id);
        Ok(record)
    }

    /// Replace the business fields of `id`.
    ///
    /// Records that are unsynced or already have a queued change are always
    /// queued so their mutations reach the server in order.
    pub async fn update(&self, id: &RecordId, details: AppointmentDetails) -> Result<Appointment> {
        let current = self.get(id).await?;
        let now = self.clock.now_millis();
        let edited = current.edited(details, now);

        let direct = self.engine.state().is_online()
            && !current.pending_sync
            && !current.id.is_provisional();
        if direct {
            match self.remote.update(&edited.id, &edited).await {
                Ok(()) => {
                    let synced = edited.into_synced();
                    self.engine.store().confirm(synced.clone()).await;
                    self.invalidate_collection().await;
                    return Ok(synced);
                }
                Err(error) => self.degrade(error)?,
            }
        }

        self.engine
            .store()
            .stage(PendingMutation::update(edited.clone(), now))
            .await;
        self.invalidate_collection().await;
        tracing::debug!("Queued update of {}", edited.id);
        Ok(edited)
    }

    pub async fn pending(&self) -> Vec<PendingMutation> {
        self.engine.store().list_pending().await
    }

    pub fn status(&self) -> SyncSnapshot {
        self.engine.state().snapshot()
    }

    async fn invalidate_collection(&self) {
        self.engine
            .cache()
            .remove(&collection_cache_key(self.scope()))
            .await;
    }

    /// Unreachable writes fall back to the queue; anything else is an error.
    fn degrade(&self, error: RemoteError) -> Result<()> {
        if error.is_transient() {
            tracing::info!("Remote write failed, queueing instead: {error}");
            self.engine.state().set_online(false);
            Ok(())
        } else {
            Err(error.into())
        }
    }
}

fn sorted(mut records: Vec<Appointment>) -> Vec<Appointment> {
    records.sort_by(|a, b| {
        a.details
            .starts_at
            .cmp(&b.details.starts_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::{CacheConfig, TieredCache};
    use crate::clock::ManualClock;
    use crate::state::SyncState;
    use crate::storage::MemoryStorage;
    use crate::store::LocalRecordStore;
    use crate::sync::{ConnectivityConfig, ConnectivityMonitor, SyncConfig, SyncMode, SyncOutcome};
    use crate::testing::MockRemote;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_760_000_000_000;

    struct Harness {
        service: AppointmentService<MockRemote, MemoryStorage>,
        engine: Arc<SyncEngine<MockRemote, MemoryStorage>>,
        remote: Arc<MockRemote>,
        clock: Arc<ManualClock>,
    }

    async fn harness(online: bool) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(NOW));
        let remote = Arc::new(MockRemote::default());
        let store = Arc::new(LocalRecordStore::open(Arc::clone(&storage)).await.unwrap());
        let cache = Arc::new(TieredCache::new(
            storage,
            clock.clone(),
            CacheConfig::default(),
        ));
        let engine = Arc::new(
            SyncEngine::new(
                Arc::clone(&remote),
                store,
                cache,
                Arc::new(SyncState::new(online)),
                SyncConfig::new("salon-1").with_collection_ttl(Duration::from_secs(60)),
            )
            .with_clock(clock.clone()),
        );
        let service = AppointmentService::new(Arc::clone(&remote), Arc::clone(&engine))
            .with_clock(clock.clone());
        Harness {
            service,
            engine,
            remote,
            clock,
        }
    }

    fn details(client: &str, starts_at: i64) -> AppointmentDetails {
        AppointmentDetails {
            client_name: client.to_string(),
            service: "Color".to_string(),
            starts_at,
            ends_at: starts_at + 3_600_000,
            price_cents: 8_000,
            ..AppointmentDetails::default()
        }
    }

    #[tokio::test]
    async fn online_create_goes_straight_to_the_server() {
        let h = harness(true).await;

        let record = h.service.create(details("Ana", NOW)).await.unwrap();

        assert_eq!(record.id.as_str(), "srv-1");
        assert!(!record.pending_sync);
        assert!(h.service.pending().await.is_empty());
        assert_eq!(h.remote.len(), 1);
    }

    #[tokio::test]
    async fn offline_create_is_queued_with_optimistic_copy() {
        let h = harness(false).await;

        let record = h.service.create(details("Ana", NOW)).await.unwrap();

        assert!(record.id.is_provisional());
        assert!(record.pending_sync);
        assert_eq!(h.service.pending().await.len(), 1);
        assert_eq!(h.service.list().await, vec![record]);
        assert_eq!(h.remote.len(), 0);
    }

    #[tokio::test]
    async fn unreachable_write_falls_back_to_queue() {
        let h = harness(true).await;
        h.remote
            .fail_with(Some(RemoteError::Unreachable("reset".to_string())));

        let record = h.service.create(details("Ana", NOW)).await.unwrap();

        assert!(record.pending_sync);
        assert_eq!(h.service.pending().await.len(), 1);
        assert!(!h.service.status().online);
    }

    #[tokio::test(start_paused = true)]
    async fn reachable_reading_resumes_background_sync_after_failed_write() {
        let h = harness(true).await;
        h.remote.set_reachable(true);
        let monitor = Arc::new(ConnectivityMonitor::new(
            Arc::clone(&h.remote),
            ConnectivityConfig {
                interval: Duration::from_millis(20),
            },
        ));
        let sync_tasks = h.engine.spawn(monitor.subscribe());
        let poller = monitor.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.service.status().online);

        h.remote
            .fail_with(Some(RemoteError::Unreachable("blip".to_string())));
        let record = h.service.create(details("Ana", NOW)).await.unwrap();
        assert!(record.pending_sync);
        assert!(!h.service.status().online);
        h.remote.fail_with(None);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(h.service.status().online);
        assert!(h.service.pending().await.is_empty());
        assert_eq!(h.remote.len(), 1);
        sync_tasks.abort();
        poller.abort();
    }

    #[tokio::test]
    async fn rejected_write_is_an_error() {
        let h = harness(true).await;
        h.remote
            .fail_with(Some(RemoteError::Rejected("overlapping slot".to_string())));

        let error = h.service.create(details("Ana", NOW)).await.unwrap_err();

        assert!(matches!(error, Error::Remote(RemoteError::Rejected(_))));
        assert!(h.service.pending().await.is_empty());
    }

    #[tokio::test]
    async fn list_miss_fills_cache_and_store() {
        let h = harness(true).await;
        h.remote.insert(Appointment {
            id: RecordId::from("srv-2"),
            owner_id: "salon-1".to_string(),
            details: details("Bea", NOW + 10),
            updated_at: NOW,
            base_updated_at: None,
            pending_sync: false,
        });
        h.remote.insert(Appointment {
            id: RecordId::from("srv-1"),
            owner_id: "salon-1".to_string(),
            details: details("Ana", NOW + 20),
            updated_at: NOW,
            base_updated_at: None,
            pending_sync: false,
        });

        let listed = h.service.list().await;
        let clients: Vec<&str> = listed
            .iter()
            .map(|r| r.details.client_name.as_str())
            .collect();
        assert_eq!(clients, vec!["Bea", "Ana"]);
        assert_eq!(h.engine.store().load_all().await.len(), 2);

        // Served from cache now, even with the server gone
        h.remote
            .fail_with(Some(RemoteError::Unreachable("down".to_string())));
        assert_eq!(h.service.list().await.len(), 2);

        // After expiry the failed query falls back to the mirror
        h.clock.advance_millis(61_000);
        assert_eq!(h.service.list().await.len(), 2);
    }

    #[tokio::test]
    async fn edits_of_queued_records_stay_queued() {
        let h = harness(false).await;
        let created = h.service.create(details("Ana", NOW)).await.unwrap();

        h.engine.state().set_online(true);
        h.clock.advance_millis(1_000);
        let edited = h
            .service
            .update(&created.id, details("Ana María", NOW))
            .await
            .unwrap();

        assert!(edited.pending_sync);
        let pending = h.service.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload.details.client_name, "Ana María");
        assert_eq!(h.remote.len(), 0);

        let outcome = h.engine.sync(SyncMode::Normal).await;
        assert!(matches!(outcome, SyncOutcome::Completed(_)));
        assert_eq!(h.remote.get("srv-1").unwrap().details.client_name, "Ana María");
    }

    #[tokio::test]
    async fn online_update_of_synced_record_is_direct() {
        let h = harness(true).await;
        let created = h.service.create(details("Ana", NOW)).await.unwrap();

        let updated = h
            .service
            .update(&created.id, details("Ana", NOW + 60_000))
            .await
            .unwrap();

        assert!(!updated.pending_sync);
        assert_eq!(h.remote.get("srv-1").unwrap().details.starts_at, NOW + 60_000);
        assert!(matches!(
            h.service.update(&RecordId::from("srv-404"), details("x", NOW)).await,
            Err(Error::NotFound(_))
        ));
    }
}
