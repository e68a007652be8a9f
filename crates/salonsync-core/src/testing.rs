//! Test doubles shared by the sync and service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::models::{Appointment, RecordId};
use crate::remote::{ReachabilityProbe, RemoteError, RemoteResult, RemoteStore};
use crate::state::SyncState;

/// In-memory stand-in for the salon backend
#[derive(Default)]
pub struct MockRemote {
    records: Mutex<HashMap<RecordId, Appointment>>,
    next_id: AtomicU32,
    creates: AtomicU32,
    /// Every payload passed to `update`, in call order
    updates: Mutex<Vec<Appointment>>,
    failure: Mutex<Option<RemoteError>>,
    /// Flipped offline when `create` is called
    drop_on_create: Mutex<Option<Arc<SyncState>>>,
    reachable: AtomicBool,
}

impl MockRemote {
    /// Store `record` as the server copy.
    pub fn insert(&self, record: Appointment) {
        let mut record = record;
        record.pending_sync = false;
        record.base_updated_at = None;
        self.records.lock().unwrap().insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<Appointment> {
        self.records.lock().unwrap().get(&RecordId::from(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Make every later call fail with `error` (or succeed again with `None`).
    pub fn fail_with(&self, error: Option<RemoteError>) {
        *self.failure.lock().unwrap() = error;
    }

    pub fn drop_connection_on_create(&self, state: Arc<SyncState>) {
        *self.drop_on_create.lock().unwrap() = Some(state);
    }

    pub fn create_calls(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_payloads(&self) -> Vec<Appointment> {
        self.updates.lock().unwrap().clone()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn check(&self) -> RemoteResult<()> {
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl RemoteStore for MockRemote {
    async fn fetch_collection(&self, scope: &str) -> RemoteResult<Vec<Appointment>> {
        self.check()?;
        let mut records: Vec<Appointment> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.owner_id == scope)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn fetch(&self, id: &RecordId) -> RemoteResult<Option<Appointment>> {
        self.check()?;
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, record: &Appointment) -> RemoteResult<RecordId> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(state) = self.drop_on_create.lock().unwrap().as_ref() {
            state.set_online(false);
        }
        self.check()?;
        let next = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = RecordId::new(format!("srv-{next}"));
        let mut stored = record.clone();
        stored.id = id.clone();
        self.insert(stored);
        Ok(id)
    }

    async fn update(&self, id: &RecordId, record: &Appointment) -> RemoteResult<()> {
        self.updates.lock().unwrap().push(record.clone());
        self.check()?;
        if !self.records.lock().unwrap().contains_key(id) {
            return Err(RemoteError::Rejected(format!("{id} not found")));
        }
        self.insert(record.clone());
        Ok(())
    }
}

impl ReachabilityProbe for MockRemote {
    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}
