//! Push engine
//!
//! Drains the outbox to the remote store, oldest first, one batch per
//! cycle. Failures mark the event and move on; events for an entity whose
//! earlier event just failed are held back so per-entity ordering survives
//! retries.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, OutboxRepository, SyncRepository};
use crate::models::now_ms;
use crate::sync::{mapper, ConnectivityProbe, OwnerProvider, RemoteStore, SyncConfig};
use crate::Result;

/// Outcome of one push cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushSummary {
    /// Events accepted by the remote
    pub pushed: usize,
    /// Events that failed this cycle
    pub failed: usize,
    /// Events held back behind a failed sibling
    pub held: usize,
}

/// Drains pending outbox events to the remote store
pub struct PushEngine {
    db: Arc<Mutex<Database>>,
    remote: Arc<dyn RemoteStore>,
    owner: Arc<dyn OwnerProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
    config: SyncConfig,
}

impl PushEngine {
    pub fn new(
        db: Arc<Mutex<Database>>,
        remote: Arc<dyn RemoteStore>,
        owner: Arc<dyn OwnerProvider>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: SyncConfig,
    ) -> Self {
        Self {
            db,
            remote,
            owner,
            connectivity,
            config,
        }
    }

    /// Run one push cycle.
    ///
    /// A no-op while logged out or offline; events keep accumulating
    /// locally in the meantime.
    pub async fn run_once(&self) -> Result<PushSummary> {
        let Some(owner_id) = self.owner.current_owner() else {
            tracing::debug!("Push skipped: logged out");
            return Ok(PushSummary::default());
        };
        if !self.connectivity.is_online() {
            tracing::debug!("Push skipped: offline");
            return Ok(PushSummary::default());
        }

        let batch = {
            let db = self.db.lock().await;
            OutboxRepository::new(db.connection())
                .pending_batch(self.config.push_batch_size, self.config.max_retries)
                .await?
        };
        if batch.is_empty() {
            return Ok(PushSummary::default());
        }

        let mut summary = PushSummary::default();
        let mut blocked_entities: HashSet<String> = HashSet::new();

        for event in batch {
            if blocked_entities.contains(&event.entity_id) {
                summary.held += 1;
                continue;
            }

            {
                let db = self.db.lock().await;
                OutboxRepository::new(db.connection())
                    .mark_syncing(&event.id)
                    .await?;
            }

            let mut row = mapper::to_remote(&event.payload);
            // Events recorded before login carry no owner; stamp the
            // session's owner so the remote accepts them
            if row["user_id"].is_null() {
                row["user_id"] = serde_json::Value::String(owner_id.clone());
            }

            let result = self
                .remote
                .upsert(event.kind, &row, &event.idempotency_key)
                .await;

            let db = self.db.lock().await;
            let outbox = OutboxRepository::new(db.connection());
            match result {
                Ok(()) => {
                    outbox.mark_synced(&event.id).await?;
                    summary.pushed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        entity_id = %event.entity_id,
                        error = %e,
                        "Push attempt failed"
                    );
                    outbox.mark_failed(&event.id, &e.to_string()).await?;
                    summary.failed += 1;
                    blocked_entities.insert(event.entity_id.clone());
                }
            }
        }

        // Every processed batch stamps the cursor, even an all-failed one
        {
            let db = self.db.lock().await;
            let sync = SyncRepository::new(db.connection());
            let mut cursor = sync.cursor().await?;
            cursor.last_push_at = Some(now_ms());
            sync.save_cursor(&cursor).await?;
        }

        tracing::info!(
            pushed = summary.pushed,
            failed = summary.failed,
            held = summary.held,
            "Push cycle completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, OutboxStatus};
    use crate::services::{TimeSlotPatch, TrackerService};
    use crate::sync::{MemoryRemoteStore, SharedConnectivity, StaticOwner};

    struct Harness {
        service: TrackerService,
        remote: Arc<MemoryRemoteStore>,
        connectivity: Arc<SharedConnectivity>,
        engine: PushEngine,
    }

    async fn harness(owner: Option<&str>, online: bool) -> Harness {
        let owner: Arc<StaticOwner> = Arc::new(match owner {
            Some(id) => StaticOwner::logged_in(id),
            None => StaticOwner::logged_out(),
        });
        let service = TrackerService::open_in_memory(owner.clone(), "device-a")
            .await
            .unwrap();
        let remote = Arc::new(MemoryRemoteStore::new());
        let connectivity = SharedConnectivity::new(online);
        let engine = PushEngine::new(
            service.database(),
            remote.clone(),
            owner,
            connectivity.clone(),
            SyncConfig::default(),
        );
        Harness {
            service,
            remote,
            connectivity,
            engine,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drains_pending_events_in_order() {
        let h = harness(Some("owner-a"), true).await;
        let slot = h
            .service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();
        h.service
            .update_slot(
                &slot.id,
                TimeSlotPatch {
                    note: Some("focus".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let summary = h.engine.run_once().await.unwrap();
        assert_eq!(summary, PushSummary { pushed: 2, failed: 0, held: 0 });

        // Final remote state reflects the update, delivered after the create
        let row = h.remote.row(EntityKind::TimeSlot, &slot.id.as_str()).unwrap();
        assert_eq!(row["note"], "focus");

        let events = h.service.list_outbox(10, None).await.unwrap();
        assert!(events.iter().all(|e| e.status == OutboxStatus::Synced));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn all_failed_batch_still_stamps_last_push_at() {
        let h = harness(Some("owner-a"), true).await;
        h.service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();

        h.remote.fail_next_upserts(1);
        let summary = h.engine.run_once().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pushed, 0);

        let db = h.service.database();
        let db = db.lock().await;
        let cursor = SyncRepository::new(db.connection()).cursor().await.unwrap();
        assert!(cursor.last_push_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn noop_while_logged_out_or_offline() {
        let h = harness(None, true).await;
        h.service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();
        assert_eq!(h.engine.run_once().await.unwrap(), PushSummary::default());

        let h = harness(Some("owner-a"), false).await;
        h.service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();
        assert_eq!(h.engine.run_once().await.unwrap(), PushSummary::default());

        // Coming back online lets the same events drain
        h.connectivity.set_online(true);
        let summary = h.engine.run_once().await.unwrap();
        assert_eq!(summary.pushed, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failure_blocks_later_events_for_same_entity() {
        let h = harness(Some("owner-a"), true).await;
        let slot = h
            .service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();
        h.service
            .update_slot(
                &slot.id,
                TimeSlotPatch {
                    energy: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        h.remote.fail_next_upserts(1);
        let summary = h.engine.run_once().await.unwrap();
        assert_eq!(summary, PushSummary { pushed: 0, failed: 1, held: 1 });

        // Next cycle retries in order and succeeds
        let summary = h.engine.run_once().await.unwrap();
        assert_eq!(summary, PushSummary { pushed: 2, failed: 0, held: 0 });
        let row = h.remote.row(EntityKind::TimeSlot, &slot.id.as_str()).unwrap();
        assert_eq!(row["energy"], 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exhausted_events_stop_retrying_but_stay_visible() {
        let h = harness(Some("owner-a"), true).await;
        h.service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();

        let config = SyncConfig::default();
        h.remote.fail_next_upserts(config.max_retries as usize);
        for _ in 0..config.max_retries {
            let summary = h.engine.run_once().await.unwrap();
            assert_eq!(summary.failed, 1);
        }

        // Cap reached: nothing eligible anymore
        assert_eq!(h.engine.run_once().await.unwrap(), PushSummary::default());
        let exhausted = h.service.list_exhausted_outbox(&config).await.unwrap();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(exhausted[0].retry_count, config.max_retries);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn prelogin_events_get_owner_stamped_on_push() {
        let owner = Arc::new(StaticOwner::logged_out());
        let service = TrackerService::open_in_memory(owner.clone(), "device-a")
            .await
            .unwrap();
        let slot = service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();

        owner.set(Some(crate::sync::OwnerProfile {
            id: "owner-a".to_string(),
            email: None,
        }));
        let remote = Arc::new(MemoryRemoteStore::new());
        let engine = PushEngine::new(
            service.database(),
            remote.clone(),
            owner,
            SharedConnectivity::new(true),
            SyncConfig::default(),
        );

        assert_eq!(engine.run_once().await.unwrap().pushed, 1);
        let row = remote.row(EntityKind::TimeSlot, &slot.id.as_str()).unwrap();
        assert_eq!(row["user_id"], "owner-a");
    }
}
