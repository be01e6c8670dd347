//! Sync cursor and conflict audit persistence

use crate::error::Result;
use crate::models::{ConflictRecord, EntityKind, SyncCursor};
use libsql::{params, Connection, Row};
use std::str::FromStr;

fn row_to_conflict(row: &Row) -> Result<ConflictRecord> {
    let kind: String = row.get(1)?;
    let local: String = row.get(3)?;
    let remote: String = row.get(4)?;
    Ok(ConflictRecord {
        id: row.get(0)?,
        kind: EntityKind::from_str(&kind)?,
        entity_id: row.get(2)?,
        local_snapshot: serde_json::from_str(&local)?,
        remote_snapshot: serde_json::from_str(&remote)?,
        detected_at: row.get(5)?,
    })
}

/// Repository for the pull watermark and the conflict audit log
pub struct SyncRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SyncRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load the cursor; defaults when none has been saved yet
    pub async fn cursor(&self) -> Result<SyncCursor> {
        let mut rows = self
            .conn
            .query(
                "SELECT last_pull_cursor, last_pull_at, last_push_at, owner_id \
                 FROM sync_cursor WHERE id = 1",
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(SyncCursor {
                last_pull_cursor: row.get(0)?,
                last_pull_at: row.get(1)?,
                last_push_at: row.get(2)?,
                owner_id: row.get(3)?,
            }),
            None => Ok(SyncCursor::default()),
        }
    }

    /// Persist the cursor, replacing any previous value
    pub async fn save_cursor(&self, cursor: &SyncCursor) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_cursor \
                 (id, last_pull_cursor, last_pull_at, last_push_at, owner_id) \
                 VALUES (1, ?1, ?2, ?3, ?4)",
                params![
                    cursor.last_pull_cursor.clone(),
                    cursor.last_pull_at,
                    cursor.last_push_at,
                    cursor.owner_id.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Drop the cursor entirely (logout / owner change)
    pub async fn reset_cursor(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_cursor WHERE id = 1", ())
            .await?;
        Ok(())
    }

    /// Append a conflict audit entry; returns its row id
    pub async fn record_conflict(
        &self,
        kind: EntityKind,
        entity_id: &str,
        local_snapshot: &serde_json::Value,
        remote_snapshot: &serde_json::Value,
        detected_at: i64,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts \
                 (kind, entity_id, local_snapshot, remote_snapshot, detected_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    kind.as_str(),
                    entity_id,
                    serde_json::to_string(local_snapshot)?,
                    serde_json::to_string(remote_snapshot)?,
                    detected_at,
                ],
            )
            .await?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Recent conflicts, newest first
    pub async fn list_conflicts(&self, limit: i64) -> Result<Vec<ConflictRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, entity_id, local_snapshot, remote_snapshot, detected_at \
                 FROM sync_conflicts ORDER BY detected_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await?;
        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(row_to_conflict(&row)?);
        }
        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cursor_defaults_then_roundtrips() {
        let db = setup().await;
        let repo = SyncRepository::new(db.connection());

        assert_eq!(repo.cursor().await.unwrap(), SyncCursor::default());

        let cursor = SyncCursor {
            last_pull_cursor: Some("2026-08-01T00:00:00.000Z".to_string()),
            last_pull_at: Some(1000),
            last_push_at: Some(900),
            owner_id: Some("owner-a".to_string()),
        };
        repo.save_cursor(&cursor).await.unwrap();
        assert_eq!(repo.cursor().await.unwrap(), cursor);

        // Saving again replaces rather than duplicates
        let updated = SyncCursor {
            last_pull_at: Some(2000),
            ..cursor
        };
        repo.save_cursor(&updated).await.unwrap();
        assert_eq!(repo.cursor().await.unwrap(), updated);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_clears_cursor() {
        let db = setup().await;
        let repo = SyncRepository::new(db.connection());

        repo.save_cursor(&SyncCursor {
            owner_id: Some("owner-a".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        repo.reset_cursor().await.unwrap();
        assert_eq!(repo.cursor().await.unwrap(), SyncCursor::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conflicts_are_append_only_and_listed_newest_first() {
        let db = setup().await;
        let repo = SyncRepository::new(db.connection());

        let local = json!({"note": "local"});
        let remote = json!({"note": "remote"});

        repo.record_conflict(EntityKind::TimeSlot, "slot-1", &local, &remote, 100)
            .await
            .unwrap();
        repo.record_conflict(EntityKind::Tag, "tag-1", &local, &remote, 200)
            .await
            .unwrap();

        let conflicts = repo.list_conflicts(10).await.unwrap();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].entity_id, "tag-1");
        assert_eq!(conflicts[1].entity_id, "slot-1");
        assert_eq!(conflicts[1].local_snapshot, local);
        assert_eq!(conflicts[1].remote_snapshot, remote);
    }
}
