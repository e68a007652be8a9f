//! Composition root wiring storage, cache, store, remote, engine and monitor.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::AppointmentService;
use crate::cache::TieredCache;
use crate::config::ClientConfig;
use crate::db::LibSqlStorage;
use crate::remote::HttpRemoteStore;
use crate::state::SyncState;
use crate::store::LocalRecordStore;
use crate::sync::{
    ConnectivityMonitor, NoopObserver, SyncEngine, SyncMode, SyncObserver, SyncOutcome, SyncTasks,
};
use crate::Result;

pub type Engine = SyncEngine<HttpRemoteStore, LibSqlStorage>;

/// Handles of every background task started by [`ClientRuntime::start`]
#[derive(Debug)]
pub struct RuntimeTasks {
    sync: SyncTasks,
    monitor: JoinHandle<()>,
    cleanup: JoinHandle<()>,
}

impl RuntimeTasks {
    fn abort(&self) {
        self.sync.abort();
        self.monitor.abort();
        self.cleanup.abort();
    }
}

/// One fully wired client: a libSQL file, the HTTP backend and the sync loop
pub struct ClientRuntime {
    config: ClientConfig,
    state: Arc<SyncState>,
    engine: Arc<Engine>,
    monitor: Arc<ConnectivityMonitor<HttpRemoteStore>>,
    appointments: AppointmentService<HttpRemoteStore, LibSqlStorage>,
}

impl ClientRuntime {
    /// Build every component on top of the database at `db_path`.
    pub async fn open(config: ClientConfig, db_path: &Path) -> Result<Self> {
        Self::open_with_observer(config, db_path, Arc::new(NoopObserver)).await
    }

    pub async fn open_with_observer(
        config: ClientConfig,
        db_path: &Path,
        observer: Arc<dyn SyncObserver>,
    ) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(LibSqlStorage::open(db_path).await?);
        let state = Arc::new(SyncState::default());
        let clock = Arc::new(crate::clock::SystemClock);
        let cache = Arc::new(TieredCache::new(
            Arc::clone(&storage),
            clock.clone(),
            config.cache_config(),
        ));
        let store = Arc::new(LocalRecordStore::open(storage).await?);
        let remote = Arc::new(HttpRemoteStore::with_timeout(
            config.api_base_url.clone(),
            config.http_timeout(),
        )?);

        let engine = Arc::new(
            SyncEngine::new(
                Arc::clone(&remote),
                store,
                cache,
                Arc::clone(&state),
                config.sync_config(),
            )
            .with_clock(clock)
            .with_observer(observer),
        );
        let monitor = Arc::new(ConnectivityMonitor::new(
            Arc::clone(&remote),
            config.connectivity_config(),
        ));
        let appointments = AppointmentService::new(remote, Arc::clone(&engine));

        tracing::debug!(
            "Client runtime opened for salon {} at {}",
            config.salon_id,
            db_path.display()
        );
        Ok(Self {
            config,
            state,
            engine,
            monitor,
            appointments,
        })
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    pub const fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub const fn appointments(&self) -> &AppointmentService<HttpRemoteStore, LibSqlStorage> {
        &self.appointments
    }

    /// Probe the backend once and update the shared online flag.
    pub async fn check_connectivity(&self) -> bool {
        let online = self.monitor.check_once().await;
        self.engine.set_online(online);
        online
    }

    /// Probe, then run a pass if the backend is reachable.
    pub async fn sync_now(&self, mode: SyncMode) -> SyncOutcome {
        self.check_connectivity().await;
        self.engine.sync(mode).await
    }

    /// Start connectivity polling, scheduled sync and cache cleanup.
    pub fn start(&self) -> RuntimeTasks {
        let sync = self.engine.spawn(self.monitor.subscribe());
        let monitor = self.monitor.spawn();
        let cleanup = self.engine.cache().spawn_cleanup();
        tracing::info!("Background sync started for salon {}", self.config.salon_id);
        RuntimeTasks {
            sync,
            monitor,
            cleanup,
        }
    }

    /// Stop background tasks and retry any unpersisted store write.
    pub async fn shutdown(&self, tasks: RuntimeTasks) -> Result<()> {
        tasks.abort();
        self.engine.store().flush().await?;
        tracing::info!("Background sync stopped");
        Ok(())
    }
}
