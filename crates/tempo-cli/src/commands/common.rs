use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use tempo_core::models::{Tag, TimeSlot};
use tempo_core::sync::{HttpRemoteStore, RemoteStore, StaticOwner};
use tempo_core::{DomainId, TagId, TimeSlotId, TrackerService};

use crate::error::CliError;
use crate::session::{self, Session};

/// Default: `<data dir>/tempo/tempo.db`
pub fn resolve_db_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("tempo").join("tempo.db"))
        .ok_or(CliError::NoDataDir)
}

/// Open the service with the persisted session's owner and device
pub async fn open_service(
    db_path: &Path,
) -> Result<(TrackerService, Arc<StaticOwner>, Session), CliError> {
    let stored = session::load(db_path)?;
    let owner = Arc::new(match &stored.owner_id {
        Some(id) => StaticOwner::logged_in(id.clone()),
        None => StaticOwner::logged_out(),
    });
    let service =
        TrackerService::open_path(db_path, owner.clone(), stored.device_id.clone()).await?;
    Ok((service, owner, stored))
}

/// Remote store from `TEMPO_REMOTE_URL` / `TEMPO_API_KEY`
pub fn remote_from_env() -> Result<Arc<dyn RemoteStore>, CliError> {
    let url = env::var("TEMPO_REMOTE_URL").ok();
    let key = env::var("TEMPO_API_KEY").ok();
    match (url, key) {
        (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
            Ok(Arc::new(HttpRemoteStore::new(url, key)?))
        }
        _ => Err(CliError::SyncNotConfigured),
    }
}

/// RFC 3339 input to Unix ms
pub fn parse_timestamp(raw: &str) -> Result<i64, CliError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| CliError::InvalidTimestamp(raw.to_string()))
}

/// Unix ms to a display timestamp
pub fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map_or_else(|| format!("{ms}ms"), |dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Today's calendar date as YYYY-MM-DD
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Resolve a slot by full id or unique prefix
pub async fn resolve_slot(service: &TrackerService, raw: &str) -> Result<TimeSlot, CliError> {
    if let Ok(id) = raw.parse::<TimeSlotId>() {
        if let Some(slot) = service.get_slot(&id).await? {
            return Ok(slot);
        }
        return Err(CliError::SlotNotFound(raw.to_string()));
    }

    let matches: Vec<TimeSlot> = service
        .list_slots(500)
        .await?
        .into_iter()
        .filter(|slot| slot.id.as_str().starts_with(raw))
        .collect();
    match matches.len() {
        0 => Err(CliError::SlotNotFound(raw.to_string())),
        1 => Ok(matches.into_iter().next().unwrap()),
        _ => Err(CliError::AmbiguousSlotId(raw.to_string())),
    }
}

/// Resolve a live tag by case-insensitive name
pub async fn resolve_tag(service: &TrackerService, name: &str) -> Result<Tag, CliError> {
    service
        .list_tags()
        .await?
        .into_iter()
        .find(|tag| tag.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| CliError::TagNotFound(name.to_string()))
}

/// Resolve tag names to ids, failing on the first unknown name
pub async fn resolve_tag_ids(
    service: &TrackerService,
    names: &[String],
) -> Result<Vec<TagId>, CliError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(resolve_tag(service, name).await?.id);
    }
    Ok(ids)
}

/// Resolve a live domain id by case-insensitive name
pub async fn resolve_domain_id(
    service: &TrackerService,
    name: &str,
) -> Result<DomainId, CliError> {
    service
        .list_domains()
        .await?
        .into_iter()
        .find(|domain| domain.name.eq_ignore_ascii_case(name))
        .map(|domain| domain.id)
        .ok_or_else(|| CliError::DomainNotFound(name.to_string()))
}

#[derive(Debug, Serialize)]
pub struct SlotListItem {
    pub id: String,
    pub start: String,
    pub end: String,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub energy: Option<i32>,
    pub mood: Option<i32>,
}

/// Render slots for listing, resolving tag ids to names
pub async fn slot_list_items(
    service: &TrackerService,
    slots: &[TimeSlot],
) -> Result<Vec<SlotListItem>, CliError> {
    let tags = service.list_tags().await?;
    let name_of = |id: &TagId| {
        tags.iter()
            .find(|t| t.id == *id)
            .map_or_else(|| id.as_str(), |t| t.name.clone())
    };

    Ok(slots
        .iter()
        .map(|slot| SlotListItem {
            id: slot.id.as_str(),
            start: format_timestamp(slot.start_time),
            end: format_timestamp(slot.end_time),
            note: slot.note.clone(),
            tags: slot.tag_ids.iter().map(name_of).collect(),
            energy: slot.energy,
            mood: slot.mood,
        })
        .collect())
}

pub fn print_slot_lines(items: &[SlotListItem]) {
    for item in items {
        let short_id = &item.id[..8.min(item.id.len())];
        let tags = if item.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", item.tags.join(", "))
        };
        let note = item.note.as_deref().unwrap_or("");
        println!("{short_id}  {} -> {}{tags}  {note}", item.start, item.end);
    }
}
