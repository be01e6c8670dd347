use std::path::Path;

use serde::Serialize;
use tempo_core::SyncConfig;

use crate::commands::common::{format_timestamp, open_service};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct OutboxListItem {
    id: String,
    kind: String,
    operation: String,
    entity_id: String,
    status: String,
    retry_count: i64,
    last_error: Option<String>,
    created_at: String,
    synced_at: Option<String>,
}

pub async fn run(failed: bool, limit: i64, json: bool, db_path: &Path) -> Result<(), CliError> {
    let (service, _, _) = open_service(db_path).await?;
    let events = if failed {
        service
            .list_exhausted_outbox(&SyncConfig::default())
            .await?
    } else {
        service.list_outbox(limit, None).await?
    };

    let items: Vec<OutboxListItem> = events
        .into_iter()
        .map(|e| OutboxListItem {
            id: e.id,
            kind: e.kind.to_string(),
            operation: e.operation.to_string(),
            entity_id: e.entity_id,
            status: e.status.to_string(),
            retry_count: e.retry_count,
            last_error: e.last_error,
            created_at: format_timestamp(e.created_at),
            synced_at: e.synced_at.map(format_timestamp),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("Outbox is empty.");
        return Ok(());
    }
    for item in items {
        let error = item
            .last_error
            .as_deref()
            .map(|e| format!("  ({e})"))
            .unwrap_or_default();
        println!(
            "{}  {}:{}  {}  {} retries={}{}",
            item.created_at,
            item.kind,
            item.operation,
            &item.entity_id[..8.min(item.entity_id.len())],
            item.status,
            item.retry_count,
            error,
        );
    }
    Ok(())
}
