use std::path::Path;

use serde::Serialize;
use tempo_core::sync::{SharedConnectivity, SyncEngine};
use tempo_core::SyncConfig;

use crate::cli::SyncCommands;
use crate::commands::common::{format_timestamp, open_service, remote_from_env};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusItem {
    online: bool,
    logged_in: bool,
    pending_events: i64,
    exhausted_events: usize,
    last_pull_at: Option<String>,
    last_push_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConflictItem {
    id: i64,
    kind: String,
    entity_id: String,
    detected_at: String,
    local_snapshot: serde_json::Value,
    remote_snapshot: serde_json::Value,
}

pub async fn run(command: SyncCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        SyncCommands::Now => {
            let (service, _, session) = open_service(db_path).await?;
            if session.owner_id.is_none() {
                return Err(CliError::NotLoggedIn);
            }
            let remote = remote_from_env()?;
            let engine = SyncEngine::new(
                &service,
                remote,
                SharedConnectivity::new(true),
                SyncConfig::default(),
            );
            let summary = engine.run_cycle().await?;
            println!(
                "Pushed {} event(s) ({} failed), pulled {} row(s) ({} deleted, {} skipped, {} conflict(s))",
                summary.push.pushed,
                summary.push.failed,
                summary.pull.applied,
                summary.pull.deleted,
                summary.pull.skipped,
                summary.pull.conflicts,
            );
        }
        SyncCommands::Status { json } => {
            let (service, _, session) = open_service(db_path).await?;
            let config = SyncConfig::default();
            let cursor = {
                let db = service.database();
                let db = db.lock().await;
                tempo_core::db::SyncRepository::new(db.connection())
                    .cursor()
                    .await?
            };
            let item = StatusItem {
                online: remote_from_env().is_ok(),
                logged_in: session.owner_id.is_some(),
                pending_events: service.pending_outbox_count(&config).await?,
                exhausted_events: service.list_exhausted_outbox(&config).await?.len(),
                last_pull_at: cursor.last_pull_at.map(format_timestamp),
                last_push_at: cursor.last_push_at.map(format_timestamp),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                println!(
                    "logged in: {}  remote configured: {}",
                    item.logged_in, item.online
                );
                println!(
                    "queue: {} pending, {} given up",
                    item.pending_events, item.exhausted_events
                );
                println!(
                    "last push: {}  last pull: {}",
                    item.last_push_at.as_deref().unwrap_or("never"),
                    item.last_pull_at.as_deref().unwrap_or("never"),
                );
            }
        }
        SyncCommands::Conflicts { limit, json } => {
            let (service, _, _) = open_service(db_path).await?;
            let conflicts = service.list_conflicts(limit).await?;
            let items: Vec<ConflictItem> = conflicts
                .into_iter()
                .map(|c| ConflictItem {
                    id: c.id,
                    kind: c.kind.to_string(),
                    entity_id: c.entity_id,
                    detected_at: format_timestamp(c.detected_at),
                    local_snapshot: c.local_snapshot,
                    remote_snapshot: c.remote_snapshot,
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
                return Ok(());
            }
            if items.is_empty() {
                println!("No sync conflicts recorded.");
                return Ok(());
            }
            for item in items {
                println!(
                    "#{}  {}  {}  {}",
                    item.id, item.detected_at, item.kind, item.entity_id
                );
            }
        }
    }
    Ok(())
}
