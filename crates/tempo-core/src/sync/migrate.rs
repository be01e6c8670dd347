//! Login migration
//!
//! Data created while anonymous has no owner and never pushes. On login,
//! every ownerless entity gets the new owner stamped and an outbox event
//! enqueued, so the next push uploads the whole local history. Ownerless
//! outbox events left over from before login are claimed as well.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    DailyLogRepository, Database, DomainRepository, OutboxRepository, SyncRepository,
    TagRepository, TimeSlotRepository,
};
use crate::models::{EntityPayload, Operation, OutboxEvent, SyncCursor};
use crate::Result;

/// Outcome of a login migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Entities stamped with the new owner
    pub entities_claimed: usize,
    /// Pre-login outbox events stamped with the new owner
    pub events_claimed: u64,
}

/// Claim all ownerless local data for `owner_id`.
///
/// Also drops any pull cursor left behind by a previous owner; the next
/// pull starts from scratch for the new account. Idempotent: a second run
/// finds nothing ownerless.
pub async fn migrate_local_to_cloud(
    db: &Arc<Mutex<Database>>,
    owner_id: &str,
) -> Result<MigrationSummary> {
    let db = db.lock().await;
    let conn = db.connection();
    let outbox = OutboxRepository::new(conn);

    let mut summary = MigrationSummary {
        events_claimed: outbox.claim_ownerless(owner_id).await?,
        ..Default::default()
    };

    let slots = TimeSlotRepository::new(conn);
    for mut slot in slots.list_ownerless().await? {
        slot.owner_id = Some(owner_id.to_string());
        slots.update(&slot).await?;
        outbox
            .append(&OutboxEvent::record(
                Operation::Create,
                EntityPayload::TimeSlot(slot),
            ))
            .await?;
        summary.entities_claimed += 1;
    }

    let tags = TagRepository::new(conn);
    for mut tag in tags.list_ownerless().await? {
        tag.owner_id = Some(owner_id.to_string());
        tags.update(&tag).await?;
        outbox
            .append(&OutboxEvent::record(
                Operation::Create,
                EntityPayload::Tag(tag),
            ))
            .await?;
        summary.entities_claimed += 1;
    }

    let domains = DomainRepository::new(conn);
    for mut domain in domains.list_ownerless().await? {
        domain.owner_id = Some(owner_id.to_string());
        domains.update(&domain).await?;
        outbox
            .append(&OutboxEvent::record(
                Operation::Create,
                EntityPayload::Domain(domain),
            ))
            .await?;
        summary.entities_claimed += 1;
    }

    let logs = DailyLogRepository::new(conn);
    for mut log in logs.list_ownerless().await? {
        log.owner_id = Some(owner_id.to_string());
        logs.update(&log).await?;
        outbox
            .append(&OutboxEvent::record(
                Operation::Create,
                EntityPayload::DailyLog(log),
            ))
            .await?;
        summary.entities_claimed += 1;
    }

    // A cursor from a previous owner must not gate the first pull
    let sync = SyncRepository::new(conn);
    let cursor = sync.cursor().await?;
    if cursor.owner_id.as_deref() != Some(owner_id) && cursor != SyncCursor::default() {
        sync.reset_cursor().await?;
    }

    tracing::info!(
        owner_id,
        entities_claimed = summary.entities_claimed,
        events_claimed = summary.events_claimed,
        "Migrated local data to account"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncCursor;
    use crate::services::TrackerService;
    use crate::sync::StaticOwner;

    #[tokio::test(flavor = "multi_thread")]
    async fn claims_entities_and_events_once() {
        let owner = Arc::new(StaticOwner::logged_out());
        let service = TrackerService::open_in_memory(owner.clone(), "device-a")
            .await
            .unwrap();

        let slot = service
            .create_slot(1000, 2000, None, vec![], None, None)
            .await
            .unwrap();
        let tag = service.create_tag("Focus", "#111111", None).await.unwrap();
        service
            .upsert_daily_log("2026-08-28", "note", vec![])
            .await
            .unwrap();

        let db = service.database();
        let summary = migrate_local_to_cloud(&db, "owner-a").await.unwrap();
        assert_eq!(summary.entities_claimed, 3);
        assert_eq!(summary.events_claimed, 3);

        let migrated = service.get_slot(&slot.id).await.unwrap().unwrap();
        assert_eq!(migrated.owner_id.as_deref(), Some("owner-a"));
        let tags = service.list_tags().await.unwrap();
        assert_eq!(tags[0].id, tag.id);
        assert_eq!(tags[0].owner_id.as_deref(), Some("owner-a"));

        // Migration enqueued one upload event per entity
        let events = service.list_outbox(20, None).await.unwrap();
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.owner_id.as_deref() == Some("owner-a")));

        // Second run is a no-op
        let again = migrate_local_to_cloud(&db, "owner-a").await.unwrap();
        assert_eq!(again, MigrationSummary::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn foreign_cursor_is_reset() {
        let owner = Arc::new(StaticOwner::logged_out());
        let service = TrackerService::open_in_memory(owner, "device-a")
            .await
            .unwrap();
        let db = service.database();

        {
            let db = db.lock().await;
            crate::db::SyncRepository::new(db.connection())
                .save_cursor(&SyncCursor {
                    last_pull_cursor: Some("2026-08-01T00:00:00.000Z".to_string()),
                    owner_id: Some("owner-old".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        migrate_local_to_cloud(&db, "owner-new").await.unwrap();

        let db = db.lock().await;
        let cursor = crate::db::SyncRepository::new(db.connection())
            .cursor()
            .await
            .unwrap();
        assert_eq!(cursor, SyncCursor::default());
    }
}
