//! Entity repositories
//!
//! One repository per synchronized collection, each borrowing the shared
//! libSQL connection. Standard list helpers exclude soft-deleted rows;
//! `get` returns them until they are physically purged.

use crate::error::{Error, Result};
use crate::models::{DailyLog, DailyLogId, Domain, DomainId, Tag, TagId, TimeSlot, TimeSlotId};
use libsql::{params, Connection, Row};

const SLOT_COLUMNS: &str = "id, start_time, end_time, note, tag_ids, energy, mood, version, \
     owner_id, device_id, created_at, updated_at, deleted_at";

const TAG_COLUMNS: &str =
    "id, name, color, domain_id, owner_id, device_id, created_at, updated_at, deleted_at";

const DOMAIN_COLUMNS: &str =
    "id, name, color, owner_id, device_id, created_at, updated_at, deleted_at";

const DAILY_LOG_COLUMNS: &str =
    "id, date, reflection, highlights, owner_id, device_id, created_at, updated_at, deleted_at";

fn parse_id<T: std::str::FromStr<Err = uuid::Error>>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|e: uuid::Error| Error::Database(format!("invalid id '{raw}': {e}")))
}

fn row_to_slot(row: &Row) -> Result<TimeSlot> {
    let id: String = row.get(0)?;
    let tag_ids: String = row.get(4)?;
    Ok(TimeSlot {
        id: parse_id(&id)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        note: row.get(3)?,
        tag_ids: serde_json::from_str(&tag_ids)?,
        energy: row.get(5)?,
        mood: row.get(6)?,
        version: row.get(7)?,
        owner_id: row.get(8)?,
        device_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        deleted_at: row.get(12)?,
    })
}

fn row_to_tag(row: &Row) -> Result<Tag> {
    let id: String = row.get(0)?;
    let domain_id: Option<String> = row.get(3)?;
    Ok(Tag {
        id: parse_id(&id)?,
        name: row.get(1)?,
        color: row.get(2)?,
        domain_id: domain_id.as_deref().map(parse_id).transpose()?,
        owner_id: row.get(4)?,
        device_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

fn row_to_domain(row: &Row) -> Result<Domain> {
    let id: String = row.get(0)?;
    Ok(Domain {
        id: parse_id(&id)?,
        name: row.get(1)?,
        color: row.get(2)?,
        owner_id: row.get(3)?,
        device_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

fn row_to_daily_log(row: &Row) -> Result<DailyLog> {
    let id: String = row.get(0)?;
    let highlights: String = row.get(3)?;
    Ok(DailyLog {
        id: parse_id(&id)?,
        date: row.get(1)?,
        reflection: row.get(2)?,
        highlights: serde_json::from_str(&highlights)?,
        owner_id: row.get(4)?,
        device_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

async fn collect<T>(
    mut rows: libsql::Rows,
    decode: impl Fn(&Row) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(decode(&row)?);
    }
    Ok(out)
}

/// Repository for time slots
pub struct TimeSlotRepository<'a> {
    conn: &'a Connection,
}

impl<'a> TimeSlotRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a full slot row
    pub async fn insert(&self, slot: &TimeSlot) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO time_slots ({SLOT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    slot.id.as_str(),
                    slot.start_time,
                    slot.end_time,
                    slot.note.clone(),
                    serde_json::to_string(&slot.tag_ids)?,
                    slot.energy,
                    slot.mood,
                    slot.version,
                    slot.owner_id.clone(),
                    slot.device_id.clone(),
                    slot.created_at,
                    slot.updated_at,
                    slot.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Overwrite an existing slot row
    pub async fn update(&self, slot: &TimeSlot) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE time_slots SET start_time = ?2, end_time = ?3, note = ?4, \
                 tag_ids = ?5, energy = ?6, mood = ?7, version = ?8, owner_id = ?9, \
                 device_id = ?10, created_at = ?11, updated_at = ?12, deleted_at = ?13 \
                 WHERE id = ?1",
                params![
                    slot.id.as_str(),
                    slot.start_time,
                    slot.end_time,
                    slot.note.clone(),
                    serde_json::to_string(&slot.tag_ids)?,
                    slot.energy,
                    slot.mood,
                    slot.version,
                    slot.owner_id.clone(),
                    slot.device_id.clone(),
                    slot.created_at,
                    slot.updated_at,
                    slot.deleted_at,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("time slot {}", slot.id)));
        }
        Ok(())
    }

    /// Insert or overwrite a row from a pulled remote snapshot
    pub async fn apply_remote(&self, slot: &TimeSlot) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO time_slots ({SLOT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    slot.id.as_str(),
                    slot.start_time,
                    slot.end_time,
                    slot.note.clone(),
                    serde_json::to_string(&slot.tag_ids)?,
                    slot.energy,
                    slot.mood,
                    slot.version,
                    slot.owner_id.clone(),
                    slot.device_id.clone(),
                    slot.created_at,
                    slot.updated_at,
                    slot.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a slot by id, tombstoned or not
    pub async fn get(&self, id: &TimeSlotId) -> Result<Option<TimeSlot>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SLOT_COLUMNS} FROM time_slots WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;
        rows.next().await?.map(|row| row_to_slot(&row)).transpose()
    }

    /// List live slots whose start time falls within `[from, to]`, oldest first
    pub async fn list_range(&self, from: i64, to: i64) -> Result<Vec<TimeSlot>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {SLOT_COLUMNS} FROM time_slots \
                 WHERE deleted_at IS NULL AND start_time >= ?1 AND start_time <= ?2 \
                 ORDER BY start_time ASC"),
                params![from, to],
            )
            .await?;
        collect(rows, row_to_slot).await
    }

    /// List all live slots, newest first
    pub async fn list(&self, limit: i64) -> Result<Vec<TimeSlot>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {SLOT_COLUMNS} FROM time_slots \
                 WHERE deleted_at IS NULL ORDER BY start_time DESC LIMIT ?1"),
                params![limit],
            )
            .await?;
        collect(rows, row_to_slot).await
    }

    /// Live slots whose tag list contains the given tag (cascade support)
    pub async fn list_live_with_tag(&self, tag_id: &TagId) -> Result<Vec<TimeSlot>> {
        // tag_ids is a JSON array of uuid strings
        let rows = self
            .conn
            .query(
                &format!("SELECT {SLOT_COLUMNS} FROM time_slots \
                 WHERE deleted_at IS NULL AND tag_ids LIKE ?1"),
                params![format!("%{}%", tag_id.as_str())],
            )
            .await?;
        collect(rows, row_to_slot).await
    }

    /// Slots with no owner stamped (anonymous/local-only)
    pub async fn list_ownerless(&self) -> Result<Vec<TimeSlot>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {SLOT_COLUMNS} FROM time_slots WHERE owner_id IS NULL"),
                (),
            )
            .await?;
        collect(rows, row_to_slot).await
    }

    /// Physically remove a row
    pub async fn hard_delete(&self, id: &TimeSlotId) -> Result<()> {
        self.conn
            .execute("DELETE FROM time_slots WHERE id = ?1", params![id.as_str()])
            .await?;
        Ok(())
    }

    /// Physically remove tombstones older than the cutoff; returns rows purged
    pub async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM time_slots WHERE deleted_at IS NOT NULL AND deleted_at < ?1",
                params![cutoff_ms],
            )
            .await?;
        Ok(affected)
    }
}

/// Repository for tags
pub struct TagRepository<'a> {
    conn: &'a Connection,
}

impl<'a> TagRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a full tag row
    pub async fn insert(&self, tag: &Tag) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO tags ({TAG_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    tag.id.as_str(),
                    tag.name.clone(),
                    tag.color.clone(),
                    tag.domain_id.map(|d| d.as_str()),
                    tag.owner_id.clone(),
                    tag.device_id.clone(),
                    tag.created_at,
                    tag.updated_at,
                    tag.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Overwrite an existing tag row
    pub async fn update(&self, tag: &Tag) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE tags SET name = ?2, color = ?3, domain_id = ?4, owner_id = ?5, \
                 device_id = ?6, created_at = ?7, updated_at = ?8, deleted_at = ?9 \
                 WHERE id = ?1",
                params![
                    tag.id.as_str(),
                    tag.name.clone(),
                    tag.color.clone(),
                    tag.domain_id.map(|d| d.as_str()),
                    tag.owner_id.clone(),
                    tag.device_id.clone(),
                    tag.created_at,
                    tag.updated_at,
                    tag.deleted_at,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("tag {}", tag.id)));
        }
        Ok(())
    }

    /// Insert or overwrite a row from a pulled remote snapshot
    pub async fn apply_remote(&self, tag: &Tag) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO tags ({TAG_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    tag.id.as_str(),
                    tag.name.clone(),
                    tag.color.clone(),
                    tag.domain_id.map(|d| d.as_str()),
                    tag.owner_id.clone(),
                    tag.device_id.clone(),
                    tag.created_at,
                    tag.updated_at,
                    tag.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a tag by id, tombstoned or not
    pub async fn get(&self, id: &TagId) -> Result<Option<Tag>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;
        rows.next().await?.map(|row| row_to_tag(&row)).transpose()
    }

    /// List live tags, name order
    pub async fn list(&self) -> Result<Vec<Tag>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {TAG_COLUMNS} FROM tags \
                 WHERE deleted_at IS NULL ORDER BY name COLLATE NOCASE ASC"),
                (),
            )
            .await?;
        collect(rows, row_to_tag).await
    }

    /// Whether a live tag with this name exists in the domain scope
    /// (case-insensitive), excluding `exclude_id` when updating
    pub async fn name_taken(
        &self,
        name: &str,
        domain_id: Option<&DomainId>,
        exclude_id: Option<&TagId>,
    ) -> Result<bool> {
        let domain = domain_id.map(DomainId::as_str);
        let exclude = exclude_id.map(TagId::as_str);
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM tags \
                 WHERE deleted_at IS NULL \
                 AND name = ?1 COLLATE NOCASE \
                 AND ((?2 IS NULL AND domain_id IS NULL) OR domain_id = ?2) \
                 AND (?3 IS NULL OR id != ?3)",
                params![name, domain, exclude],
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

    /// Count of live tags referencing the given domain (referential guard)
    pub async fn count_live_in_domain(&self, domain_id: &DomainId) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM tags WHERE deleted_at IS NULL AND domain_id = ?1",
                params![domain_id.as_str()],
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

    /// Tags with no owner stamped (anonymous/local-only)
    pub async fn list_ownerless(&self) -> Result<Vec<Tag>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE owner_id IS NULL"),
                (),
            )
            .await?;
        collect(rows, row_to_tag).await
    }

    /// Physically remove a row
    pub async fn hard_delete(&self, id: &TagId) -> Result<()> {
        self.conn
            .execute("DELETE FROM tags WHERE id = ?1", params![id.as_str()])
            .await?;
        Ok(())
    }

    /// Physically remove tombstones older than the cutoff; returns rows purged
    pub async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM tags WHERE deleted_at IS NOT NULL AND deleted_at < ?1",
                params![cutoff_ms],
            )
            .await?;
        Ok(affected)
    }
}

/// Repository for domains
pub struct DomainRepository<'a> {
    conn: &'a Connection,
}

impl<'a> DomainRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a full domain row
    pub async fn insert(&self, domain: &Domain) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO domains ({DOMAIN_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    domain.id.as_str(),
                    domain.name.clone(),
                    domain.color.clone(),
                    domain.owner_id.clone(),
                    domain.device_id.clone(),
                    domain.created_at,
                    domain.updated_at,
                    domain.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Overwrite an existing domain row
    pub async fn update(&self, domain: &Domain) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE domains SET name = ?2, color = ?3, owner_id = ?4, device_id = ?5, \
                 created_at = ?6, updated_at = ?7, deleted_at = ?8 WHERE id = ?1",
                params![
                    domain.id.as_str(),
                    domain.name.clone(),
                    domain.color.clone(),
                    domain.owner_id.clone(),
                    domain.device_id.clone(),
                    domain.created_at,
                    domain.updated_at,
                    domain.deleted_at,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("domain {}", domain.id)));
        }
        Ok(())
    }

    /// Insert or overwrite a row from a pulled remote snapshot
    pub async fn apply_remote(&self, domain: &Domain) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO domains ({DOMAIN_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    domain.id.as_str(),
                    domain.name.clone(),
                    domain.color.clone(),
                    domain.owner_id.clone(),
                    domain.device_id.clone(),
                    domain.created_at,
                    domain.updated_at,
                    domain.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a domain by id, tombstoned or not
    pub async fn get(&self, id: &DomainId) -> Result<Option<Domain>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;
        rows.next()
            .await?
            .map(|row| row_to_domain(&row))
            .transpose()
    }

    /// List live domains, name order
    pub async fn list(&self) -> Result<Vec<Domain>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {DOMAIN_COLUMNS} FROM domains \
                 WHERE deleted_at IS NULL ORDER BY name COLLATE NOCASE ASC"),
                (),
            )
            .await?;
        collect(rows, row_to_domain).await
    }

    /// Whether a live domain with this name exists (case-insensitive)
    pub async fn name_taken(&self, name: &str, exclude_id: Option<&DomainId>) -> Result<bool> {
        let exclude = exclude_id.map(DomainId::as_str);
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM domains \
                 WHERE deleted_at IS NULL AND name = ?1 COLLATE NOCASE \
                 AND (?2 IS NULL OR id != ?2)",
                params![name, exclude],
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

    /// Domains with no owner stamped (anonymous/local-only)
    pub async fn list_ownerless(&self) -> Result<Vec<Domain>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE owner_id IS NULL"),
                (),
            )
            .await?;
        collect(rows, row_to_domain).await
    }

    /// Physically remove a row
    pub async fn hard_delete(&self, id: &DomainId) -> Result<()> {
        self.conn
            .execute("DELETE FROM domains WHERE id = ?1", params![id.as_str()])
            .await?;
        Ok(())
    }

    /// Physically remove tombstones older than the cutoff; returns rows purged
    pub async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM domains WHERE deleted_at IS NOT NULL AND deleted_at < ?1",
                params![cutoff_ms],
            )
            .await?;
        Ok(affected)
    }
}

/// Repository for daily logs
pub struct DailyLogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> DailyLogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a full daily log row
    pub async fn insert(&self, log: &DailyLog) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO daily_logs ({DAILY_LOG_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    log.id.as_str(),
                    log.date.clone(),
                    log.reflection.clone(),
                    serde_json::to_string(&log.highlights)?,
                    log.owner_id.clone(),
                    log.device_id.clone(),
                    log.created_at,
                    log.updated_at,
                    log.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Overwrite an existing daily log row
    pub async fn update(&self, log: &DailyLog) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE daily_logs SET date = ?2, reflection = ?3, highlights = ?4, \
                 owner_id = ?5, device_id = ?6, created_at = ?7, updated_at = ?8, \
                 deleted_at = ?9 WHERE id = ?1",
                params![
                    log.id.as_str(),
                    log.date.clone(),
                    log.reflection.clone(),
                    serde_json::to_string(&log.highlights)?,
                    log.owner_id.clone(),
                    log.device_id.clone(),
                    log.created_at,
                    log.updated_at,
                    log.deleted_at,
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("daily log {}", log.id)));
        }
        Ok(())
    }

    /// Insert or overwrite a row from a pulled remote snapshot
    pub async fn apply_remote(&self, log: &DailyLog) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO daily_logs ({DAILY_LOG_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    log.id.as_str(),
                    log.date.clone(),
                    log.reflection.clone(),
                    serde_json::to_string(&log.highlights)?,
                    log.owner_id.clone(),
                    log.device_id.clone(),
                    log.created_at,
                    log.updated_at,
                    log.deleted_at,
                ],
            )
            .await?;
        Ok(())
    }

    /// Fetch a daily log by id, tombstoned or not
    pub async fn get(&self, id: &DailyLogId) -> Result<Option<DailyLog>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;
        rows.next()
            .await?
            .map(|row| row_to_daily_log(&row))
            .transpose()
    }

    /// Fetch the live log for a calendar date, if any
    pub async fn get_by_date(&self, date: &str) -> Result<Option<DailyLog>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DAILY_LOG_COLUMNS} FROM daily_logs \
                 WHERE deleted_at IS NULL AND date = ?1"),
                params![date],
            )
            .await?;
        rows.next()
            .await?
            .map(|row| row_to_daily_log(&row))
            .transpose()
    }

    /// List live logs, newest date first
    pub async fn list(&self, limit: i64) -> Result<Vec<DailyLog>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {DAILY_LOG_COLUMNS} FROM daily_logs \
                 WHERE deleted_at IS NULL ORDER BY date DESC LIMIT ?1"),
                params![limit],
            )
            .await?;
        collect(rows, row_to_daily_log).await
    }

    /// Daily logs with no owner stamped (anonymous/local-only)
    pub async fn list_ownerless(&self) -> Result<Vec<DailyLog>> {
        let rows = self
            .conn
            .query(
                &format!("SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE owner_id IS NULL"),
                (),
            )
            .await?;
        collect(rows, row_to_daily_log).await
    }

    /// Physically remove a row
    pub async fn hard_delete(&self, id: &DailyLogId) -> Result<()> {
        self.conn
            .execute("DELETE FROM daily_logs WHERE id = ?1", params![id.as_str()])
            .await?;
        Ok(())
    }

    /// Physically remove tombstones older than the cutoff; returns rows purged
    pub async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM daily_logs WHERE deleted_at IS NOT NULL AND deleted_at < ?1",
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
    use crate::models::now_ms;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slot_insert_get_roundtrip() {
        let db = setup().await;
        let repo = TimeSlotRepository::new(db.connection());

        let mut slot = TimeSlot::new(1000, 2000, "device-a");
        slot.note = Some("deep work".to_string());
        slot.tag_ids = vec![TagId::new()];
        repo.insert(&slot).await.unwrap();

        let fetched = repo.get(&slot.id).await.unwrap().unwrap();
        assert_eq!(fetched, slot);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn soft_deleted_slot_hidden_from_lists_but_gettable() {
        let db = setup().await;
        let repo = TimeSlotRepository::new(db.connection());

        let mut slot = TimeSlot::new(1000, 2000, "device-a");
        repo.insert(&slot).await.unwrap();

        slot.deleted_at = Some(now_ms());
        slot.updated_at = slot.deleted_at.unwrap();
        repo.update(&slot).await.unwrap();

        assert!(repo.list(100).await.unwrap().is_empty());
        assert!(repo.list_range(0, 10_000).await.unwrap().is_empty());
        assert!(repo.get(&slot.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_missing_slot_is_not_found() {
        let db = setup().await;
        let repo = TimeSlotRepository::new(db.connection());

        let slot = TimeSlot::new(0, 1, "device-a");
        let err = repo.update(&slot).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tag_name_taken_is_case_insensitive_and_scoped() {
        let db = setup().await;
        let repo = TagRepository::new(db.connection());

        let tag = Tag::new("Focus", "#111111", "device-a");
        repo.insert(&tag).await.unwrap();

        assert!(repo.name_taken("focus", None, None).await.unwrap());
        assert!(repo.name_taken("FOCUS", None, None).await.unwrap());
        // Same name under a domain is a different scope
        let domain_id = DomainId::new();
        assert!(!repo.name_taken("focus", Some(&domain_id), None).await.unwrap());
        // The tag itself is excluded when updating
        assert!(!repo.name_taken("focus", None, Some(&tag.id)).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn domain_referential_count() {
        let db = setup().await;
        let domains = DomainRepository::new(db.connection());
        let tags = TagRepository::new(db.connection());

        let domain = Domain::new("Work", "#222222", "device-a");
        domains.insert(&domain).await.unwrap();

        let mut tag = Tag::new("Meetings", "#333333", "device-a");
        tag.domain_id = Some(domain.id);
        tags.insert(&tag).await.unwrap();

        assert_eq!(tags.count_live_in_domain(&domain.id).await.unwrap(), 1);

        tag.deleted_at = Some(now_ms());
        tags.update(&tag).await.unwrap();
        assert_eq!(tags.count_live_in_domain(&domain.id).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn purge_respects_cutoff() {
        let db = setup().await;
        let repo = TimeSlotRepository::new(db.connection());

        let mut old = TimeSlot::new(0, 1, "device-a");
        old.deleted_at = Some(1000);
        repo.insert(&old).await.unwrap();

        let mut recent = TimeSlot::new(2, 3, "device-a");
        recent.deleted_at = Some(5000);
        repo.insert(&recent).await.unwrap();

        let purged = repo.purge_deleted_before(2000).await.unwrap();
        assert_eq!(purged, 1);
        assert!(repo.get(&old.id).await.unwrap().is_none());
        assert!(repo.get(&recent.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn daily_log_by_date() {
        let db = setup().await;
        let repo = DailyLogRepository::new(db.connection());

        let mut log = DailyLog::new("2026-08-28", "device-a");
        log.reflection = "good day".to_string();
        log.highlights = vec!["shipped sync".to_string()];
        repo.insert(&log).await.unwrap();

        let fetched = repo.get_by_date("2026-08-28").await.unwrap().unwrap();
        assert_eq!(fetched, log);
        assert!(repo.get_by_date("2026-08-29").await.unwrap().is_none());
    }
}
