//! Outbox event persistence
//!
//! The outbox is append-mostly: event content never changes after insert,
//! only the delivery bookkeeping columns (`status`, `retry_count`,
//! `last_error`, `synced_at`) are updated as the push engine drains.

use crate::error::{Error, Result};
use crate::models::{now_ms, EntityKind, OutboxEvent, OutboxStatus};
use libsql::{params, Connection, Row};
use std::str::FromStr;

const OUTBOX_COLUMNS: &str = "id, kind, operation, entity_id, payload, idempotency_key, \
     owner_id, device_id, status, retry_count, last_error, created_at, synced_at";

fn row_to_event(row: &Row) -> Result<OutboxEvent> {
    let kind: String = row.get(1)?;
    let operation: String = row.get(2)?;
    let payload: String = row.get(4)?;
    let status: String = row.get(8)?;
    Ok(OutboxEvent {
        id: row.get(0)?,
        kind: EntityKind::from_str(&kind)?,
        operation: operation.parse()?,
        entity_id: row.get(3)?,
        payload: serde_json::from_str(&payload)?,
        idempotency_key: row.get(5)?,
        owner_id: row.get(6)?,
        device_id: row.get(7)?,
        status: OutboxStatus::from_str(&status)?,
        retry_count: row.get(9)?,
        last_error: row.get(10)?,
        created_at: row.get(11)?,
        synced_at: row.get(12)?,
    })
}

/// Repository for outbox events
pub struct OutboxRepository<'a> {
    conn: &'a Connection,
}

impl<'a> OutboxRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a new event
    pub async fn append(&self, event: &OutboxEvent) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO outbox_events ({OUTBOX_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    event.id.clone(),
                    event.kind.as_str(),
                    event.operation.as_str(),
                    event.entity_id.clone(),
                    serde_json::to_string(&event.payload)?,
                    event.idempotency_key.clone(),
                    event.owner_id.clone(),
                    event.device_id.clone(),
                    event.status.as_str(),
                    event.retry_count,
                    event.last_error.clone(),
                    event.created_at,
                    event.synced_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch one event by id
    pub async fn get(&self, id: &str) -> Result<Option<OutboxEvent>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {OUTBOX_COLUMNS} FROM outbox_events WHERE id = ?1"),
                params![id],
            )
            .await?;
        rows.next().await?.map(|row| row_to_event(&row)).transpose()
    }

    /// Next batch of events eligible for pushing, oldest first.
    ///
    /// Pending events are always eligible; failed events only while their
    /// retry count is below the cap.
    pub async fn pending_batch(&self, limit: i64, max_retries: i64) -> Result<Vec<OutboxEvent>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {OUTBOX_COLUMNS} FROM outbox_events \
                 WHERE status = 'pending' OR (status = 'failed' AND retry_count < ?2) \
                 ORDER BY created_at ASC, id ASC LIMIT ?1"),
                params![limit, max_retries],
            )
            .await?;
        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(row_to_event(&row)?);
        }
        Ok(events)
    }

    /// Mark an event as in flight
    pub async fn mark_syncing(&self, id: &str) -> Result<()> {
        self.set_status(id, "UPDATE outbox_events SET status = 'syncing' WHERE id = ?1", params![id])
            .await
    }

    /// Mark an event delivered
    pub async fn mark_synced(&self, id: &str) -> Result<()> {
        self.set_status(
            id,
            "UPDATE outbox_events SET status = 'synced', synced_at = ?2, last_error = NULL \
             WHERE id = ?1",
            params![id, now_ms()],
        )
        .await
    }

    /// Record a failed attempt, bumping the retry count
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        self.set_status(
            id,
            "UPDATE outbox_events SET status = 'failed', retry_count = retry_count + 1, \
             last_error = ?2 WHERE id = ?1",
            params![id, error],
        )
        .await
    }

    async fn set_status(&self, id: &str, sql: &str, params: impl libsql::params::IntoParams) -> Result<()> {
        let affected = self.conn.execute(sql, params).await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("outbox event {id}")));
        }
        Ok(())
    }

    /// Whether any undelivered event targets the given entity.
    ///
    /// Pull applies skip entities with in-flight local intent so a stale
    /// remote snapshot cannot clobber changes that have not pushed yet.
    pub async fn has_inflight_for(&self, entity_id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM outbox_events \
                 WHERE entity_id = ?1 AND status IN ('pending', 'syncing', 'failed')",
                params![entity_id],
            )
            .await?;
        let count: i64 = rows
            .next()
            .await?
            .map(|row| row.get(0))
            .transpose()?
            .unwrap_or(0);
        Ok(count > 0)
    }

    /// Count of events waiting to push (pending or retryable failed)
    pub async fn pending_count(&self, max_retries: i64) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM outbox_events \
                 WHERE status = 'pending' OR (status = 'failed' AND retry_count < ?1)",
                params![max_retries],
            )
            .await?;
        let count: i64 = rows
            .next()
            .await?
            .map(|row| row.get(0))
            .transpose()?
            .unwrap_or(0);
        Ok(count)
    }

    /// Events that exhausted their retries, newest first
    pub async fn list_exhausted(&self, max_retries: i64) -> Result<Vec<OutboxEvent>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {OUTBOX_COLUMNS} FROM outbox_events \
                 WHERE status = 'failed' AND retry_count >= ?1 \
                 ORDER BY created_at DESC"),
                params![max_retries],
            )
            .await?;
        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(row_to_event(&row)?);
        }
        Ok(events)
    }

    /// Recent events, newest first, optionally filtered by status
    pub async fn list_recent(
        &self,
        limit: i64,
        status: Option<OutboxStatus>,
    ) -> Result<Vec<OutboxEvent>> {
        let mut rows = match status {
            Some(status) => {
                self.conn
                    .query(
                        &format!("SELECT {OUTBOX_COLUMNS} FROM outbox_events \
                         WHERE status = ?2 ORDER BY created_at DESC LIMIT ?1"),
                        params![limit, status.as_str()],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        &format!("SELECT {OUTBOX_COLUMNS} FROM outbox_events \
                         ORDER BY created_at DESC LIMIT ?1"),
                        params![limit],
                    )
                    .await?
            }
        };
        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(row_to_event(&row)?);
        }
        Ok(events)
    }

    /// Stamp the owner on every ownerless event (login migration)
    pub async fn claim_ownerless(&self, owner_id: &str) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "UPDATE outbox_events SET owner_id = ?1 WHERE owner_id IS NULL",
                params![owner_id],
            )
            .await?;
        Ok(affected)
    }

    /// Remove delivered events older than the cutoff; returns rows purged.
    ///
    /// Failed events are never purged, they remain visible for diagnosis.
    pub async fn purge_synced_before(&self, cutoff_ms: i64) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM outbox_events \
                 WHERE status = 'synced' AND synced_at IS NOT NULL AND synced_at < ?1",
                params![cutoff_ms],
            )
            .await?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{EntityPayload, Operation, Tag, TimeSlot};

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn slot_event(operation: Operation) -> OutboxEvent {
        let slot = TimeSlot::new(0, 1000, "device-a");
        OutboxEvent::record(operation, EntityPayload::TimeSlot(slot))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn append_and_fetch_roundtrip() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let event = slot_event(Operation::Create);
        repo.append(&event).await.unwrap();

        let fetched = repo.get(&event.id).await.unwrap().unwrap();
        assert_eq!(fetched, event);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_batch_is_oldest_first_and_capped() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let mut first = slot_event(Operation::Create);
        first.created_at = 100;
        let mut second = slot_event(Operation::Create);
        second.created_at = 200;
        let mut third = slot_event(Operation::Create);
        third.created_at = 300;

        // Insert out of order to prove ordering comes from created_at
        repo.append(&third).await.unwrap();
        repo.append(&first).await.unwrap();
        repo.append(&second).await.unwrap();

        let batch = repo.pending_batch(2, 5).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, first.id);
        assert_eq!(batch[1].id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_events_retry_until_cap_then_stick() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let event = slot_event(Operation::Update);
        repo.append(&event).await.unwrap();

        for attempt in 1..=5 {
            repo.mark_failed(&event.id, "remote unavailable").await.unwrap();
            let stored = repo.get(&event.id).await.unwrap().unwrap();
            assert_eq!(stored.retry_count, attempt);
            assert_eq!(stored.status, OutboxStatus::Failed);
        }

        // At the cap the event drops out of the batch but stays queryable
        assert!(repo.pending_batch(10, 5).await.unwrap().is_empty());
        assert_eq!(repo.pending_count(5).await.unwrap(), 0);
        let exhausted = repo.list_exhausted(5).await.unwrap();
        assert_eq!(exhausted.len(), 1);
        assert_eq!(
            exhausted[0].last_error.as_deref(),
            Some("remote unavailable")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mark_synced_clears_error_and_stamps_time() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let event = slot_event(Operation::Create);
        repo.append(&event).await.unwrap();
        repo.mark_failed(&event.id, "timeout").await.unwrap();
        repo.mark_syncing(&event.id).await.unwrap();
        repo.mark_synced(&event.id).await.unwrap();

        let stored = repo.get(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OutboxStatus::Synced);
        assert!(stored.synced_at.is_some());
        assert_eq!(stored.last_error, None);
        // Retry history survives delivery
        assert_eq!(stored.retry_count, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn inflight_detection_covers_pending_syncing_failed() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let event = slot_event(Operation::Update);
        repo.append(&event).await.unwrap();
        assert!(repo.has_inflight_for(&event.entity_id).await.unwrap());

        repo.mark_syncing(&event.id).await.unwrap();
        assert!(repo.has_inflight_for(&event.entity_id).await.unwrap());

        repo.mark_failed(&event.id, "boom").await.unwrap();
        assert!(repo.has_inflight_for(&event.entity_id).await.unwrap());

        repo.mark_synced(&event.id).await.unwrap();
        assert!(!repo.has_inflight_for(&event.entity_id).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn purge_only_removes_old_synced_events() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let mut old_synced = slot_event(Operation::Create);
        old_synced.status = OutboxStatus::Synced;
        old_synced.synced_at = Some(1000);
        repo.append(&old_synced).await.unwrap();

        let mut failed = slot_event(Operation::Update);
        failed.status = OutboxStatus::Failed;
        failed.retry_count = 5;
        repo.append(&failed).await.unwrap();

        let purged = repo.purge_synced_before(2000).await.unwrap();
        assert_eq!(purged, 1);
        assert!(repo.get(&old_synced.id).await.unwrap().is_none());
        assert!(repo.get(&failed.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn claim_ownerless_stamps_only_anonymous_events() {
        let db = setup().await;
        let repo = OutboxRepository::new(db.connection());

        let anonymous = slot_event(Operation::Create);
        repo.append(&anonymous).await.unwrap();

        let mut owned_tag = Tag::new("Focus", "#111111", "device-a");
        owned_tag.owner_id = Some("owner-b".to_string());
        let owned = OutboxEvent::record(Operation::Create, EntityPayload::Tag(owned_tag));
        repo.append(&owned).await.unwrap();

        let claimed = repo.claim_ownerless("owner-a").await.unwrap();
        assert_eq!(claimed, 1);
        let stored = repo.get(&anonymous.id).await.unwrap().unwrap();
        assert_eq!(stored.owner_id.as_deref(), Some("owner-a"));
        let untouched = repo.get(&owned.id).await.unwrap().unwrap();
        assert_eq!(untouched.owner_id.as_deref(), Some("owner-b"));
    }
}
