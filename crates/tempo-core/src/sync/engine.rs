//! Sync loop orchestrator
//!
//! One cycle is push, then pull, then a retention sweep. The background
//! loop runs a cycle immediately on start, then on a fixed interval, and
//! once more every time connectivity comes back.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::models::now_ms;
use crate::services::{RetentionSummary, TrackerService};
use crate::sync::{
    ConnectivityProbe, PullEngine, PullSummary, PushEngine, PushSummary, RemoteStore, SyncConfig,
};
use crate::Result;

/// Outcome of one full sync cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCycleSummary {
    pub push: PushSummary,
    pub pull: PullSummary,
    pub retention: RetentionSummary,
    /// When the cycle finished (Unix ms)
    pub completed_at: i64,
}

/// Point-in-time view of the engine for status surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Whether the background loop is running
    pub running: bool,
    /// Whether the remote is currently reachable
    pub online: bool,
    /// Whether a session is active
    pub logged_in: bool,
    /// Events waiting to push
    pub pending_events: i64,
    /// Last completed cycle, if any
    pub last_cycle: Option<SyncCycleSummary>,
    /// Error from the most recent failed cycle
    pub last_error: Option<String>,
}

struct Inner {
    service: TrackerService,
    push: PushEngine,
    pull: PullEngine,
    connectivity: Arc<dyn ConnectivityProbe>,
    config: SyncConfig,
    last_cycle: std::sync::Mutex<Option<SyncCycleSummary>>,
    last_error: std::sync::Mutex<Option<String>>,
}

/// Orchestrates push, pull, and retention over a shared database
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
    handle: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl SyncEngine {
    /// Build an engine over the service's database and session
    #[must_use]
    pub fn new(
        service: &TrackerService,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: SyncConfig,
    ) -> Self {
        let db = service.database();
        let owner = service.owner_provider();
        let push = PushEngine::new(
            Arc::clone(&db),
            Arc::clone(&remote),
            Arc::clone(&owner),
            Arc::clone(&connectivity),
            config.clone(),
        );
        let pull = PullEngine::new(
            db,
            remote,
            owner,
            Arc::clone(&connectivity),
            config.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                service: service.clone(),
                push,
                pull,
                connectivity,
                config,
                last_cycle: std::sync::Mutex::new(None),
                last_error: std::sync::Mutex::new(None),
            }),
            handle: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Run one cycle now: push, pull, retention sweep
    pub async fn run_cycle(&self) -> Result<SyncCycleSummary> {
        let result = self.cycle_inner().await;
        match &result {
            Ok(summary) => {
                *self.inner.last_cycle.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                    Some(*summary);
                *self.inner.last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                    None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sync cycle failed");
                *self.inner.last_error.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
                    Some(e.to_string());
            }
        }
        result
    }

    async fn cycle_inner(&self) -> Result<SyncCycleSummary> {
        let push = self.inner.push.run_once().await?;
        let pull = self.inner.pull.run_once().await?;
        let retention = self.inner.service.sweep_retention(&self.inner.config).await?;
        Ok(SyncCycleSummary {
            push,
            pull,
            retention,
            completed_at: now_ms(),
        })
    }

    /// Start the background loop; a second start is a no-op
    pub async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let engine = self.clone();
        *handle = Some(tokio::spawn(async move {
            let mut online_rx = engine.inner.connectivity.subscribe();
            let mut ticker = tokio::time::interval(engine.inner.config.sync_interval);
            // First tick fires immediately: the startup cycle
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _ = engine.run_cycle().await;
                    }
                    changed = online_rx.changed() => {
                        if changed.is_err() {
                            // Probe dropped; keep the interval loop alive
                            continue;
                        }
                        if *online_rx.borrow_and_update() {
                            tracing::info!("Connectivity restored, syncing");
                            let _ = engine.run_cycle().await;
                        }
                    }
                }
            }
        }));
    }

    /// Stop the background loop; in-flight cycles are abandoned
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }

    /// Snapshot the engine's current status
    pub async fn status(&self) -> Result<SyncStatus> {
        let pending_events = self
            .inner
            .service
            .pending_outbox_count(&self.inner.config)
            .await?;
        Ok(SyncStatus {
            running: self
                .handle
                .lock()
                .await
                .as_ref()
                .is_some_and(|h| !h.is_finished()),
            online: self.inner.connectivity.is_online(),
            logged_in: self
                .inner
                .service
                .owner_provider()
                .current_owner()
                .is_some(),
            pending_events,
            last_cycle: *self
                .inner
                .last_cycle
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            last_error: self
                .inner
                .last_error
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;
    use crate::sync::{MemoryRemoteStore, SharedConnectivity, StaticOwner};
    use std::time::Duration;

    async fn device(
        owner: &str,
        device_id: &str,
        remote: &Arc<MemoryRemoteStore>,
        connectivity: &Arc<SharedConnectivity>,
    ) -> (TrackerService, SyncEngine) {
        let owner: Arc<StaticOwner> = Arc::new(StaticOwner::logged_in(owner));
        let service = TrackerService::open_in_memory(owner, device_id)
            .await
            .unwrap();
        let engine = SyncEngine::new(
            &service,
            remote.clone(),
            connectivity.clone(),
            SyncConfig::default(),
        );
        (service, engine)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn two_devices_converge_through_the_remote() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let online = SharedConnectivity::new(true);
        let (svc_a, eng_a) = device("owner-1", "device-a", &remote, &online).await;
        let (svc_b, eng_b) = device("owner-1", "device-b", &remote, &online).await;

        let slot = svc_a
            .create_slot(1000, 2000, Some("from A".to_string()), vec![], None, None)
            .await
            .unwrap();

        let a = eng_a.run_cycle().await.unwrap();
        assert_eq!(a.push.pushed, 1);

        let b = eng_b.run_cycle().await.unwrap();
        assert_eq!(b.pull.applied, 1);
        let pulled = svc_b.get_slot(&slot.id).await.unwrap().unwrap();
        assert_eq!(pulled.note.as_deref(), Some("from A"));

        // B deletes; A converges to the deletion
        svc_b.delete_slot(&slot.id).await.unwrap();
        let b = eng_b.run_cycle().await.unwrap();
        assert_eq!(b.push.pushed, 1);

        let a = eng_a.run_cycle().await.unwrap();
        assert_eq!(a.pull.deleted, 1);
        assert!(svc_a.get_slot(&slot.id).await.unwrap().is_none());
        assert_eq!(remote.row_count(EntityKind::TimeSlot), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_reflects_session_queue_and_loop() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let online = SharedConnectivity::new(false);
        let (svc, engine) = device("owner-1", "device-a", &remote, &online).await;

        svc.create_tag("Focus", "#111111", None).await.unwrap();

        let status = engine.status().await.unwrap();
        assert!(!status.running);
        assert!(!status.online);
        assert!(status.logged_in);
        assert_eq!(status.pending_events, 1);
        assert_eq!(status.last_cycle, None);

        // Offline cycle is a clean no-op
        let summary = engine.run_cycle().await.unwrap();
        assert_eq!(summary.push, PushSummary::default());
        let status = engine.status().await.unwrap();
        assert_eq!(status.pending_events, 1);
        assert_eq!(status.last_error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn background_loop_syncs_on_reconnect() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let online = SharedConnectivity::new(false);
        let (svc, engine) = device("owner-1", "device-a", &remote, &online).await;
        let tag = svc.create_tag("Focus", "#111111", None).await.unwrap();

        engine.start().await;
        engine.start().await; // second start is a no-op
        assert!(engine.status().await.unwrap().running);

        // Offline: the startup cycle cannot deliver anything
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(remote.row_count(EntityKind::Tag), 0);

        online.set_online(true);
        // The reconnect-triggered cycle drains the queue
        for _ in 0..100 {
            if remote.row_count(EntityKind::Tag) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(remote.row(EntityKind::Tag, &tag.id.as_str()).is_some());

        engine.stop().await;
        assert!(!engine.status().await.unwrap().running);
    }
}
