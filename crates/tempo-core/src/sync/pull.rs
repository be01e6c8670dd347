//! Pull engine
//!
//! Fetches remote rows changed since the stored cursor and applies them
//! locally. Remote wins, with two carve-outs: entities with undelivered
//! local events are skipped entirely, and overwrites of locally-newer
//! copies leave a conflict audit record. Remote tombstones delete the
//! local row outright.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    DailyLogRepository, Database, DomainRepository, OutboxRepository, SyncRepository,
    TagRepository, TimeSlotRepository,
};
use crate::models::{now_ms, EntityKind, EntityPayload, SyncCursor};
use crate::sync::{mapper, ConnectivityProbe, OwnerProvider, RemoteStore, SyncConfig};
use crate::Result;

/// Outcome of one pull cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullSummary {
    /// Rows applied locally
    pub applied: usize,
    /// Local rows removed by remote tombstones
    pub deleted: usize,
    /// Rows skipped because local events are still in flight
    pub skipped: usize,
    /// Overwrites of locally-newer copies, each audited
    pub conflicts: usize,
}

impl PullSummary {
    const fn received(&self) -> usize {
        self.applied + self.deleted + self.skipped
    }
}

/// Applies remote changes to the local store
pub struct PullEngine {
    db: Arc<Mutex<Database>>,
    remote: Arc<dyn RemoteStore>,
    owner: Arc<dyn OwnerProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
    config: SyncConfig,
}

impl PullEngine {
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

    /// Run one pull cycle.
    ///
    /// Remote failures never abort the cycle: a failed fetch skips that
    /// kind and a malformed row is skipped. The cursor only advances after
    /// at least one row arrived and every kind fetched cleanly, so missed
    /// changes are retried on the next cycle.
    pub async fn run_once(&self) -> Result<PullSummary> {
        let Some(owner_id) = self.owner.current_owner() else {
            tracing::debug!("Pull skipped: logged out");
            return Ok(PullSummary::default());
        };
        if !self.connectivity.is_online() {
            tracing::debug!("Pull skipped: offline");
            return Ok(PullSummary::default());
        }

        let started_at = now_ms();
        let stored = {
            let db = self.db.lock().await;
            SyncRepository::new(db.connection()).cursor().await?
        };
        // A cursor recorded under another owner is ignored: first-sync
        // semantics after every account switch
        let cursor = stored.cursor_for_owner(&owner_id).map(ToString::to_string);
        let window_start = mapper::ms_to_iso(self.config.pull_window_start(started_at));

        let mut summary = PullSummary::default();
        let mut fetch_failed = false;
        for kind in EntityKind::ALL {
            let min_start_time = (kind == EntityKind::TimeSlot).then_some(window_start.as_str());
            let rows = match self
                .remote
                .select_changed(kind, &owner_id, cursor.as_deref(), min_start_time)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Pull fetch failed");
                    fetch_failed = true;
                    continue;
                }
            };

            for row in rows {
                let payload = match mapper::to_local(kind, &row) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(kind = %kind, error = %e, "Skipping malformed remote row");
                        continue;
                    }
                };
                self.apply(&payload, &row, &mut summary).await?;
            }
        }

        if summary.received() > 0 && !fetch_failed {
            let db = self.db.lock().await;
            let sync = SyncRepository::new(db.connection());
            let mut next = sync.cursor().await?;
            next = SyncCursor {
                last_pull_cursor: Some(mapper::ms_to_iso(started_at)),
                last_pull_at: Some(started_at),
                owner_id: Some(owner_id),
                ..next
            };
            sync.save_cursor(&next).await?;
        }

        tracing::info!(
            applied = summary.applied,
            deleted = summary.deleted,
            skipped = summary.skipped,
            conflicts = summary.conflicts,
            "Pull cycle completed"
        );
        Ok(summary)
    }

    async fn apply(
        &self,
        payload: &EntityPayload,
        remote_row: &serde_json::Value,
        summary: &mut PullSummary,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let entity_id = payload.entity_id();

        // Undelivered local intent outranks the remote snapshot; the next
        // push/pull round trip converges both sides
        if OutboxRepository::new(conn)
            .has_inflight_for(&entity_id)
            .await?
        {
            tracing::debug!(entity_id = %entity_id, "Pull skipped entity with in-flight events");
            summary.skipped += 1;
            return Ok(());
        }

        let local_snapshot = Self::local_snapshot(conn, payload).await?;

        // Tombstones are terminal and bypass the conflict audit
        if let Some((local_json, local_updated_at)) = &local_snapshot {
            if !payload.is_deleted() && *local_updated_at > payload.updated_at() {
                SyncRepository::new(conn)
                    .record_conflict(
                        payload.kind(),
                        &entity_id,
                        local_json,
                        remote_row,
                        now_ms(),
                    )
                    .await?;
                summary.conflicts += 1;
                tracing::warn!(
                    entity_id = %entity_id,
                    kind = %payload.kind(),
                    "Remote overwrote a locally-newer copy; conflict recorded"
                );
            }
        }

        match payload {
            EntityPayload::TimeSlot(slot) => {
                let repo = TimeSlotRepository::new(conn);
                if slot.is_deleted() {
                    repo.hard_delete(&slot.id).await?;
                    summary.deleted += 1;
                } else {
                    repo.apply_remote(slot).await?;
                    summary.applied += 1;
                }
            }
            EntityPayload::Tag(tag) => {
                let repo = TagRepository::new(conn);
                if tag.is_deleted() {
                    repo.hard_delete(&tag.id).await?;
                    summary.deleted += 1;
                } else {
                    repo.apply_remote(tag).await?;
                    summary.applied += 1;
                }
            }
            EntityPayload::Domain(domain) => {
                let repo = DomainRepository::new(conn);
                if domain.is_deleted() {
                    repo.hard_delete(&domain.id).await?;
                    summary.deleted += 1;
                } else {
                    repo.apply_remote(domain).await?;
                    summary.applied += 1;
                }
            }
            EntityPayload::DailyLog(log) => {
                let repo = DailyLogRepository::new(conn);
                if log.is_deleted() {
                    repo.hard_delete(&log.id).await?;
                    summary.deleted += 1;
                } else {
                    repo.apply_remote(log).await?;
                    summary.applied += 1;
                }
            }
        }
        Ok(())
    }

    /// Current local copy as JSON plus its `updated_at`, if present
    async fn local_snapshot(
        conn: &libsql::Connection,
        payload: &EntityPayload,
    ) -> Result<Option<(serde_json::Value, i64)>> {
        let snapshot = match payload {
            EntityPayload::TimeSlot(slot) => TimeSlotRepository::new(conn)
                .get(&slot.id)
                .await?
                .map(|local| (serde_json::to_value(&local), local.updated_at)),
            EntityPayload::Tag(tag) => TagRepository::new(conn)
                .get(&tag.id)
                .await?
                .map(|local| (serde_json::to_value(&local), local.updated_at)),
            EntityPayload::Domain(domain) => DomainRepository::new(conn)
                .get(&domain.id)
                .await?
                .map(|local| (serde_json::to_value(&local), local.updated_at)),
            EntityPayload::DailyLog(log) => DailyLogRepository::new(conn)
                .get(&log.id)
                .await?
                .map(|local| (serde_json::to_value(&local), local.updated_at)),
        };
        match snapshot {
            Some((json, updated_at)) => Ok(Some((json?, updated_at))),
            None => Ok(None),
        }
    }
}
