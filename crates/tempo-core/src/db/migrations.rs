//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Run a batch of statements inside one transaction
async fn run_batch(conn: &Connection, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    Ok(())
}

/// Migration to version 1: entity collections
async fn migrate_v1(conn: &Connection) -> Result<()> {
    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Time slots
        "CREATE TABLE IF NOT EXISTS time_slots (
            id TEXT PRIMARY KEY,
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            note TEXT,
            tag_ids TEXT NOT NULL DEFAULT '[]',
            energy INTEGER,
            mood INTEGER,
            version INTEGER NOT NULL DEFAULT 1,
            owner_id TEXT,
            device_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_time_slots_updated ON time_slots(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_time_slots_start ON time_slots(start_time DESC)",
        "CREATE INDEX IF NOT EXISTS idx_time_slots_deleted ON time_slots(deleted_at)",
        // Tags
        "CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            domain_id TEXT,
            owner_id TEXT,
            device_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_tags_updated ON tags(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_tags_domain ON tags(domain_id)",
        "CREATE INDEX IF NOT EXISTS idx_tags_deleted ON tags(deleted_at)",
        // Domains
        "CREATE TABLE IF NOT EXISTS domains (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            owner_id TEXT,
            device_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_domains_updated ON domains(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_domains_deleted ON domains(deleted_at)",
        // Daily logs
        "CREATE TABLE IF NOT EXISTS daily_logs (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            reflection TEXT NOT NULL DEFAULT '',
            highlights TEXT NOT NULL DEFAULT '[]',
            owner_id TEXT,
            device_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_daily_logs_date ON daily_logs(date)",
        "CREATE INDEX IF NOT EXISTS idx_daily_logs_updated ON daily_logs(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_daily_logs_deleted ON daily_logs(deleted_at)",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    run_batch(conn, &statements).await?;
    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: outbox, cursor, and conflict log
async fn migrate_v2(conn: &Connection) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS outbox_events (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            operation TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            idempotency_key TEXT NOT NULL,
            owner_id TEXT,
            device_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at INTEGER NOT NULL,
            synced_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_outbox_status_created ON outbox_events(status, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_outbox_entity ON outbox_events(entity_id)",
        // Singleton pull/push watermark
        "CREATE TABLE IF NOT EXISTS sync_cursor (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_pull_cursor TEXT,
            last_pull_at INTEGER,
            last_push_at INTEGER,
            owner_id TEXT
        )",
        // Append-only conflict audit log
        "CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            local_snapshot TEXT NOT NULL,
            remote_snapshot TEXT NOT NULL,
            detected_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_entity ON sync_conflicts(entity_id)",
        "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_detected ON sync_conflicts(detected_at DESC)",
        "INSERT INTO schema_version (version) VALUES (2)",
    ];

    run_batch(conn, &statements).await?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
