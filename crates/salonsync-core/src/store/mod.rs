//! Local record store: the device's mirror of appointments plus the pending
//! mutation queue.
//!
//! Both collections live in memory for the lifetime of the process and are
//! written through to durable storage as whole JSON documents. A failed write
//! marks the store dirty and is retried on the next mutation or `flush`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::models::{Appointment, MutationKind, PendingMutation, RecordId};
use crate::storage::DurableStorage;
use crate::Result;

const RECORDS_KEY: &str = "store:records";
const QUEUE_KEY: &str = "store:queue";

#[derive(Debug, Default)]
struct StoreState {
    records: Vec<Appointment>,
    queue: Vec<PendingMutation>,
    dirty: bool,
}

impl StoreState {
    fn upsert(&mut self, record: Appointment) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    fn remove_queued(&mut self, record_id: &RecordId) -> Option<PendingMutation> {
        let index = self
            .queue
            .iter()
            .position(|mutation| &mutation.record_id == record_id)?;
        Some(self.queue.remove(index))
    }

    fn push_queued(&mut self, mutation: PendingMutation) {
        let merged = match self.remove_queued(&mutation.record_id) {
            Some(existing) => existing.superseded_by(mutation),
            None => mutation,
        };
        self.queue.push(merged);
    }
}

/// Durable mirror of appointments and FIFO queue of pending mutations
pub struct LocalRecordStore<S> {
    storage: Arc<S>,
    state: Mutex<StoreState>,
}

impl<S: DurableStorage> LocalRecordStore<S> {
    /// Load the mirror and queue from `storage`.
    ///
    /// Read failures are returned; undecodable documents are logged and
    /// replaced with empty collections.
    pub async fn open(storage: Arc<S>) -> Result<Self> {
        let records: Vec<Appointment> = load_document(storage.as_ref(), RECORDS_KEY).await?;
        let queue: Vec<PendingMutation> = load_document(storage.as_ref(), QUEUE_KEY).await?;
        tracing::debug!(
            "Opened local store with {} records and {} pending mutations",
            records.len(),
            queue.len()
        );

        Ok(Self {
            storage,
            state: Mutex::new(StoreState {
                records,
                queue,
                dirty: false,
            }),
        })
    }

    /// Replace the whole mirror.
    pub async fn save_all(&self, records: Vec<Appointment>) {
        let mut state = self.state.lock().await;
        state.records = records;
        self.persist(&mut state).await;
    }

    /// Every mirrored record.
    pub async fn load_all(&self) -> Vec<Appointment> {
        self.state.lock().await.records.clone()
    }

    pub async fn get(&self, id: &RecordId) -> Option<Appointment> {
        let state = self.state.lock().await;
        state.records.iter().find(|record| &record.id == id).cloned()
    }

    /// Append `mutation`, replacing any queued mutation for the same record.
    pub async fn enqueue(&self, mutation: PendingMutation) {
        let mut state = self.state.lock().await;
        state.push_queued(mutation);
        self.persist(&mut state).await;
    }

    /// The full queue in enqueue order.
    pub async fn list_pending(&self) -> Vec<PendingMutation> {
        self.state.lock().await.queue.clone()
    }

    /// Remove the queued mutation for `record_id`.
    pub async fn dequeue(&self, record_id: &RecordId) -> Option<PendingMutation> {
        let mut state = self.state.lock().await;
        let removed = state.remove_queued(record_id);
        if removed.is_some() {
            self.persist(&mut state).await;
        }
        removed
    }

    /// Write the optimistic copy and queue the mutation in one step.
    pub async fn stage(&self, mutation: PendingMutation) {
        let mut state = self.state.lock().await;
        let mut optimistic = mutation.payload.clone();
        optimistic.pending_sync = true;
        state.upsert(optimistic);
        state.push_queued(mutation);
        self.persist(&mut state).await;
    }

    /// Record that `record` is now the confirmed remote version.
    pub async fn confirm(&self, record: Appointment) {
        let mut state = self.state.lock().await;
        state.remove_queued(&record.id);
        let mut confirmed = record;
        confirmed.pending_sync = false;
        state.upsert(confirmed);
        self.persist(&mut state).await;
    }

    /// Retire a provisional id after the create in `pushed` was confirmed as `server_id`.
    ///
    /// Rewrites the mirror and the queue in one step so no reference to the
    /// provisional id survives. If a newer local edit was queued while the
    /// create was in flight, it stays queued as an update of the server record.
    pub async fn replace_provisional(
        &self,
        pushed: &PendingMutation,
        server_id: RecordId,
    ) -> Appointment {
        let mut state = self.state.lock().await;
        let provisional = &pushed.record_id;
        let confirmed_at = pushed.payload.updated_at;

        let newer = state
            .queue
            .iter_mut()
            .find(|mutation| &mutation.record_id == provisional)
            .filter(|mutation| *mutation != pushed);

        let record = if let Some(newer) = newer {
            newer.record_id = server_id.clone();
            newer.kind = MutationKind::Update;
            newer.payload.id = server_id.clone();
            newer.payload.base_updated_at = Some(confirmed_at);
            let mut record = newer.payload.clone();
            record.pending_sync = true;
            record
        } else {
            state.remove_queued(provisional);
            let mut record = pushed.payload.clone().into_synced();
            record.id = server_id;
            record
        };

        state.records.retain(|r| &r.id != provisional);
        state.upsert(record.clone());
        self.persist(&mut state).await;
        record
    }

    /// Record that the update in `pushed` was accepted remotely.
    ///
    /// Dequeues it unless a newer edit replaced it in the meantime; that edit
    /// is rebased onto the version just written.
    pub async fn settle(&self, pushed: &PendingMutation) {
        let mut state = self.state.lock().await;
        let confirmed_at = pushed.payload.updated_at;

        let newer = state
            .queue
            .iter_mut()
            .find(|mutation| mutation.record_id == pushed.record_id)
            .filter(|mutation| *mutation != pushed);

        if let Some(newer) = newer {
            newer.payload.base_updated_at = Some(confirmed_at);
            let mut record = newer.payload.clone();
            record.pending_sync = true;
            state.upsert(record);
        } else {
            state.remove_queued(&pushed.record_id);
            state.upsert(pushed.payload.clone().into_synced());
        }
        self.persist(&mut state).await;
    }

    /// Replace the mirror with the remote collection, keeping local versions
    /// of every record that still has a queued mutation.
    pub async fn adopt_remote(&self, remote: Vec<Appointment>) {
        let mut state = self.state.lock().await;
        let pending: Vec<Appointment> = state
            .records
            .iter()
            .filter(|record| record.pending_sync)
            .cloned()
            .collect();

        let mut merged: Vec<Appointment> = remote
            .into_iter()
            .filter(|record| !pending.iter().any(|local| local.id == record.id))
            .map(Appointment::into_synced)
            .collect();
        merged.extend(pending);

        state.records = merged;
        self.persist(&mut state).await;
    }

    /// Whether the last durable write failed.
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Retry persisting after an earlier failure.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.dirty {
            return Ok(());
        }
        self.write_documents(&state).await?;
        state.dirty = false;
        Ok(())
    }

    async fn persist(&self, state: &mut StoreState) {
        match self.write_documents(state).await {
            Ok(()) => state.dirty = false,
            Err(error) => {
                tracing::warn!("Local store write failed, will retry: {error}");
                state.dirty = true;
            }
        }
    }

    async fn write_documents(&self, state: &StoreState) -> Result<()> {
        let queue = serde_json::to_vec(&state.queue)?;
        let records = serde_json::to_vec(&state.records)?;
        self.storage.write(QUEUE_KEY, &queue).await?;
        self.storage.write(RECORDS_KEY, &records).await
    }
}

async fn load_document<S, T>(storage: &S, key: &str) -> Result<Vec<T>>
where
    S: DurableStorage,
    T: DeserializeOwned,
{
    let Some(bytes) = storage.read(key).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_slice(&bytes) {
        Ok(items) => Ok(items),
        Err(error) => {
            tracing::warn!("Discarding undecodable local document {key}: {error}");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::models::{AppointmentDetails, MutationKind};
    use crate::storage::MemoryStorage;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn appointment(id: &str, client: &str, updated_at: i64) -> Appointment {
        Appointment {
            id: RecordId::from(id),
            owner_id: "salon-1".to_string(),
            details: AppointmentDetails {
                client_name: client.to_string(),
                service: "Cut".to_string(),
                ..AppointmentDetails::default()
            },
            updated_at,
            base_updated_at: None,
            pending_sync: false,
        }
    }

    async fn setup() -> (LocalRecordStore<MemoryStorage>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalRecordStore::open(Arc::clone(&storage)).await.unwrap();
        (store, storage)
    }

    /// Storage whose writes can be switched off
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: AtomicBool,
    }

    impl DurableStorage for FlakyStorage {
        async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Storage("write refused".to_string()));
            }
            self.inner.write(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }

        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.list_keys(prefix).await
        }
    }

    #[tokio::test]
    async fn save_all_replaces_whole_mirror() {
        let (store, _storage) = setup().await;
        store
            .save_all(vec![appointment("srv-1", "Ana", 1), appointment("srv-2", "Bea", 1)])
            .await;
        store.save_all(vec![appointment("srv-3", "Cris", 1)]).await;

        let records = store.load_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "srv-3");
    }

    #[tokio::test]
    async fn enqueue_keeps_only_latest_payload_per_record() {
        let (store, _storage) = setup().await;
        store
            .enqueue(PendingMutation::update(appointment("srv-1", "edit1", 1), 1))
            .await;
        store
            .enqueue(PendingMutation::update(appointment("srv-2", "other", 1), 2))
            .await;
        store
            .enqueue(PendingMutation::update(appointment("srv-1", "edit2", 2), 3))
            .await;

        let pending = store.list_pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].record_id.as_str(), "srv-2");
        assert_eq!(pending[1].payload.details.client_name, "edit2");
    }

    #[tokio::test]
    async fn dequeue_removes_only_named_record() {
        let (store, _storage) = setup().await;
        store
            .enqueue(PendingMutation::update(appointment("srv-1", "a", 1), 1))
            .await;
        store
            .enqueue(PendingMutation::update(appointment("srv-2", "b", 1), 2))
            .await;

        let removed = store.dequeue(&RecordId::from("srv-1")).await.unwrap();
        assert_eq!(removed.record_id.as_str(), "srv-1");
        assert!(store.dequeue(&RecordId::from("srv-1")).await.is_none());
        assert_eq!(store.list_pending().await.len(), 1);
    }

    #[tokio::test]
    async fn stage_pairs_pending_record_with_queue_entry() {
        let (store, _storage) = setup().await;
        let record = Appointment::new_local("salon-1", AppointmentDetails::default(), 5);
        store.stage(PendingMutation::create(record.clone(), 5)).await;

        let stored = store.get(&record.id).await.unwrap();
        assert!(stored.pending_sync);
        let pending = store.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record_id, record.id);
    }

    #[tokio::test]
    async fn replace_provisional_rewrites_every_reference() {
        let (store, _storage) = setup().await;
        let pushed = PendingMutation::create(appointment("local-100", "Ana", 10), 10);
        store.stage(pushed.clone()).await;

        let synced = store
            .replace_provisional(&pushed, RecordId::from("srv-7"))
            .await;

        assert_eq!(synced.id.as_str(), "srv-7");
        assert!(!synced.pending_sync);
        assert_eq!(synced.base_updated_at, Some(10));
        assert!(store.list_pending().await.is_empty());
        let records = store.load_all().await;
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|r| r.id.as_str() != "local-100"));
    }

    #[tokio::test]
    async fn edit_made_during_create_becomes_update_of_server_record() {
        let (store, _storage) = setup().await;
        let pushed = PendingMutation::create(appointment("local-100", "Ana", 10), 10);
        store.stage(pushed.clone()).await;
        store
            .stage(PendingMutation::update(appointment("local-100", "Ana B.", 12), 12))
            .await;

        let record = store
            .replace_provisional(&pushed, RecordId::from("srv-7"))
            .await;

        assert!(record.pending_sync);
        assert_eq!(record.details.client_name, "Ana B.");
        let pending = store.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record_id.as_str(), "srv-7");
        assert_eq!(pending[0].kind, MutationKind::Update);
        assert_eq!(pending[0].payload.id.as_str(), "srv-7");
        assert_eq!(pending[0].payload.base_updated_at, Some(10));
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn settle_dequeues_pushed_update() {
        let (store, _storage) = setup().await;
        let mut edit = appointment("srv-1", "edited", 20);
        edit.base_updated_at = Some(10);
        let pushed = PendingMutation::update(edit, 20);
        store.stage(pushed.clone()).await;

        store.settle(&pushed).await;

        assert!(store.list_pending().await.is_empty());
        let stored = store.get(&RecordId::from("srv-1")).await.unwrap();
        assert!(!stored.pending_sync);
        assert_eq!(stored.base_updated_at, Some(20));
    }

    #[tokio::test]
    async fn settle_rebases_newer_edit() {
        let (store, _storage) = setup().await;
        let pushed = PendingMutation::update(appointment("srv-1", "first", 20), 20);
        store.stage(pushed.clone()).await;
        store
            .stage(PendingMutation::update(appointment("srv-1", "second", 25), 25))
            .await;

        store.settle(&pushed).await;

        let pending = store.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload.details.client_name, "second");
        assert_eq!(pending[0].payload.base_updated_at, Some(20));
        let stored = store.get(&RecordId::from("srv-1")).await.unwrap();
        assert!(stored.pending_sync);
        assert_eq!(stored.details.client_name, "second");
    }

    #[tokio::test]
    async fn adopt_remote_preserves_pending_local_versions() {
        let (store, _storage) = setup().await;
        let mut local_edit = appointment("srv-1", "local edit", 20);
        local_edit.base_updated_at = Some(10);
        store
            .stage(PendingMutation::update(local_edit.clone(), 20))
            .await;
        let offline_create = appointment("local-1", "new", 21);
        store
            .stage(PendingMutation::create(offline_create, 21))
            .await;

        store
            .adopt_remote(vec![
                appointment("srv-1", "remote", 15),
                appointment("srv-2", "other", 12),
            ])
            .await;

        let mut records = store.load_all().await;
        records.sort_by(|a, b| a.id.cmp(&b.id));
        let clients: Vec<&str> = records
            .iter()
            .map(|r| r.details.client_name.as_str())
            .collect();
        assert_eq!(clients, vec!["new", "local edit", "other"]);
        let srv2 = records.iter().find(|r| r.id.as_str() == "srv-2").unwrap();
        assert_eq!(srv2.base_updated_at, Some(12));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let (store, storage) = setup().await;
        store
            .stage(PendingMutation::create(appointment("local-1", "Ana", 1), 1))
            .await;
        drop(store);

        let reopened = LocalRecordStore::open(storage).await.unwrap();
        assert_eq!(reopened.list_pending().await.len(), 1);
        assert_eq!(
            reopened.list_pending().await[0].kind,
            MutationKind::Create
        );
        assert_eq!(reopened.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_documents_open_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write(QUEUE_KEY, b"not json").await.unwrap();

        let store = LocalRecordStore::open(storage).await.unwrap();
        assert!(store.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn failed_writes_mark_dirty_until_flushed() {
        let storage = Arc::new(FlakyStorage::default());
        let store = LocalRecordStore::open(Arc::clone(&storage)).await.unwrap();

        storage.failing.store(true, Ordering::SeqCst);
        store
            .enqueue(PendingMutation::update(appointment("srv-1", "a", 1), 1))
            .await;
        assert!(store.is_dirty().await);
        assert_eq!(store.list_pending().await.len(), 1);
        assert!(store.flush().await.is_err());

        storage.failing.store(false, Ordering::SeqCst);
        store.flush().await.unwrap();
        assert!(!store.is_dirty().await);
        assert!(storage.inner.read(QUEUE_KEY).await.unwrap().is_some());
    }
}
