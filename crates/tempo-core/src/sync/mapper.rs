//! Local/remote entity mapping
//!
//! The remote store speaks snake_case rows with RFC 3339 timestamps,
//! `user_id` for the owner and `client_id` for the device. Locally,
//! timestamps are Unix milliseconds. Mapping is lossless in both
//! directions for every synchronized field.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{DailyLog, Domain, EntityKind, EntityPayload, Tag, TimeSlot};

/// Unix ms to an RFC 3339 timestamp with millisecond precision
#[must_use]
pub fn ms_to_iso(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// RFC 3339 timestamp to Unix ms
pub fn iso_to_ms(iso: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(iso)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| Error::Remote(format!("invalid timestamp '{iso}': {e}")))
}

fn opt_ms_to_iso(ms: Option<i64>) -> Value {
    ms.map_or(Value::Null, |ms| Value::String(ms_to_iso(ms)))
}

fn str_field(row: &Value, field: &str) -> Result<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| Error::Remote(format!("remote row missing field '{field}'")))
}

fn opt_str_field(row: &Value, field: &str) -> Option<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn iso_field(row: &Value, field: &str) -> Result<i64> {
    iso_to_ms(&str_field(row, field)?)
}

fn opt_iso_field(row: &Value, field: &str) -> Result<Option<i64>> {
    opt_str_field(row, field).map(|s| iso_to_ms(&s)).transpose()
}

/// Map a local snapshot to the remote row shape for its kind
#[must_use]
pub fn to_remote(payload: &EntityPayload) -> Value {
    match payload {
        EntityPayload::TimeSlot(slot) => json!({
            "id": slot.id.as_str(),
            "user_id": slot.owner_id,
            "client_id": slot.device_id,
            "start_time": ms_to_iso(slot.start_time),
            "end_time": ms_to_iso(slot.end_time),
            "note": slot.note,
            "tag_ids": slot.tag_ids.iter().map(crate::models::TagId::as_str).collect::<Vec<_>>(),
            "energy": slot.energy,
            "mood": slot.mood,
            "version": slot.version,
            "created_at": ms_to_iso(slot.created_at),
            "updated_at": ms_to_iso(slot.updated_at),
            "deleted_at": opt_ms_to_iso(slot.deleted_at),
        }),
        EntityPayload::Tag(tag) => json!({
            "id": tag.id.as_str(),
            "user_id": tag.owner_id,
            "client_id": tag.device_id,
            "name": tag.name,
            "color": tag.color,
            "domain_id": tag.domain_id.map(|d| d.as_str()),
            "created_at": ms_to_iso(tag.created_at),
            "updated_at": ms_to_iso(tag.updated_at),
            "deleted_at": opt_ms_to_iso(tag.deleted_at),
        }),
        EntityPayload::Domain(domain) => json!({
            "id": domain.id.as_str(),
            "user_id": domain.owner_id,
            "client_id": domain.device_id,
            "name": domain.name,
            "color": domain.color,
            "created_at": ms_to_iso(domain.created_at),
            "updated_at": ms_to_iso(domain.updated_at),
            "deleted_at": opt_ms_to_iso(domain.deleted_at),
        }),
        EntityPayload::DailyLog(log) => json!({
            "id": log.id.as_str(),
            "user_id": log.owner_id,
            "client_id": log.device_id,
            "date": log.date,
            "reflection": log.reflection,
            "highlights": log.highlights,
            "created_at": ms_to_iso(log.created_at),
            "updated_at": ms_to_iso(log.updated_at),
            "deleted_at": opt_ms_to_iso(log.deleted_at),
        }),
    }
}

/// Map a remote row to a local snapshot of the given kind
pub fn to_local(kind: EntityKind, row: &Value) -> Result<EntityPayload> {
    match kind {
        EntityKind::TimeSlot => {
            let id = str_field(row, "id")?;
            let tag_ids = row
                .get("tag_ids")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .map(|v| {
                            v.as_str()
                                .ok_or_else(|| {
                                    Error::Remote("non-string tag id in remote row".to_string())
                                })?
                                .parse()
                                .map_err(|e| Error::Remote(format!("invalid tag id: {e}")))
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default();

            Ok(EntityPayload::TimeSlot(TimeSlot {
                id: id
                    .parse()
                    .map_err(|e| Error::Remote(format!("invalid slot id '{id}': {e}")))?,
                start_time: iso_field(row, "start_time")?,
                end_time: iso_field(row, "end_time")?,
                note: opt_str_field(row, "note"),
                tag_ids,
                energy: row.get("energy").and_then(Value::as_i64).map(|v| v as i32),
                mood: row.get("mood").and_then(Value::as_i64).map(|v| v as i32),
                version: row.get("version").and_then(Value::as_i64).unwrap_or(1),
                owner_id: opt_str_field(row, "user_id"),
                device_id: str_field(row, "client_id")?,
                created_at: iso_field(row, "created_at")?,
                updated_at: iso_field(row, "updated_at")?,
                deleted_at: opt_iso_field(row, "deleted_at")?,
            }))
        }
        EntityKind::Tag => {
            let id = str_field(row, "id")?;
            let domain_id = opt_str_field(row, "domain_id")
                .map(|d| {
                    d.parse()
                        .map_err(|e| Error::Remote(format!("invalid domain id '{d}': {e}")))
                })
                .transpose()?;
            Ok(EntityPayload::Tag(Tag {
                id: id
                    .parse()
                    .map_err(|e| Error::Remote(format!("invalid tag id '{id}': {e}")))?,
                name: str_field(row, "name")?,
                color: str_field(row, "color")?,
                domain_id,
                owner_id: opt_str_field(row, "user_id"),
                device_id: str_field(row, "client_id")?,
                created_at: iso_field(row, "created_at")?,
                updated_at: iso_field(row, "updated_at")?,
                deleted_at: opt_iso_field(row, "deleted_at")?,
            }))
        }
        EntityKind::Domain => {
            let id = str_field(row, "id")?;
            Ok(EntityPayload::Domain(Domain {
                id: id
                    .parse()
                    .map_err(|e| Error::Remote(format!("invalid domain id '{id}': {e}")))?,
                name: str_field(row, "name")?,
                color: str_field(row, "color")?,
                owner_id: opt_str_field(row, "user_id"),
                device_id: str_field(row, "client_id")?,
                created_at: iso_field(row, "created_at")?,
                updated_at: iso_field(row, "updated_at")?,
                deleted_at: opt_iso_field(row, "deleted_at")?,
            }))
        }
        EntityKind::DailyLog => {
            let id = str_field(row, "id")?;
            let highlights = row
                .get("highlights")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|v| {
                            v.as_str().map(ToString::to_string).ok_or_else(|| {
                                Error::Remote("non-string highlight in remote row".to_string())
                            })
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default();
            Ok(EntityPayload::DailyLog(DailyLog {
                id: id
                    .parse()
                    .map_err(|e| Error::Remote(format!("invalid daily log id '{id}': {e}")))?,
                date: str_field(row, "date")?,
                reflection: str_field(row, "reflection").unwrap_or_default(),
                highlights,
                owner_id: opt_str_field(row, "user_id"),
                device_id: str_field(row, "client_id")?,
                created_at: iso_field(row, "created_at")?,
                updated_at: iso_field(row, "updated_at")?,
                deleted_at: opt_iso_field(row, "deleted_at")?,
            }))
        }
    }
}
