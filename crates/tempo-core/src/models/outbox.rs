//! Outbox event model
//!
//! Every local mutation appends exactly one [`OutboxEvent`] describing the
//! intended remote-side effect. Events are immutable in content after
//! creation; only `status`, `retry_count` and `last_error` change as the
//! push engine drains them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{DailyLog, Domain, EntityKind, Tag, TimeSlot};

/// The remote-side effect an outbox event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Stable string code stored in the outbox table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(crate::Error::Database(format!(
                "unknown outbox operation '{other}'"
            ))),
        }
    }
}

/// Delivery state of an outbox event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Waiting for the next push batch.
    Pending,
    /// Currently being pushed.
    Syncing,
    /// Accepted by the remote store.
    Synced,
    /// Last push attempt failed; eligible again until the retry cap.
    Failed,
}

impl OutboxStatus {
    /// Stable string code stored in the outbox table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::Database(format!(
                "unknown outbox status '{other}'"
            ))),
        }
    }
}

/// Full entity snapshot carried by an outbox event, tagged by kind.
///
/// Create/update events carry the post-write snapshot; delete events carry
/// the tombstoned snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum EntityPayload {
    TimeSlot(TimeSlot),
    Tag(Tag),
    Domain(Domain),
    DailyLog(DailyLog),
}

impl EntityPayload {
    /// The entity kind this payload carries.
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::TimeSlot(_) => EntityKind::TimeSlot,
            Self::Tag(_) => EntityKind::Tag,
            Self::Domain(_) => EntityKind::Domain,
            Self::DailyLog(_) => EntityKind::DailyLog,
        }
    }

    /// The target entity id as a string.
    pub fn entity_id(&self) -> String {
        match self {
            Self::TimeSlot(slot) => slot.id.as_str(),
            Self::Tag(tag) => tag.id.as_str(),
            Self::Domain(domain) => domain.id.as_str(),
            Self::DailyLog(log) => log.id.as_str(),
        }
    }

    /// The snapshot's `updated_at` timestamp (Unix ms).
    pub const fn updated_at(&self) -> i64 {
        match self {
            Self::TimeSlot(slot) => slot.updated_at,
            Self::Tag(tag) => tag.updated_at,
            Self::Domain(domain) => domain.updated_at,
            Self::DailyLog(log) => log.updated_at,
        }
    }

    /// The snapshot's owner, if stamped.
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Self::TimeSlot(slot) => slot.owner_id.as_deref(),
            Self::Tag(tag) => tag.owner_id.as_deref(),
            Self::Domain(domain) => domain.owner_id.as_deref(),
            Self::DailyLog(log) => log.owner_id.as_deref(),
        }
    }

    /// Whether the snapshot carries a tombstone.
    pub const fn is_deleted(&self) -> bool {
        match self {
            Self::TimeSlot(slot) => slot.deleted_at.is_some(),
            Self::Tag(tag) => tag.deleted_at.is_some(),
            Self::Domain(domain) => domain.deleted_at.is_some(),
            Self::DailyLog(log) => log.deleted_at.is_some(),
        }
    }

    /// The snapshot's originating device.
    pub fn device_id(&self) -> &str {
        match self {
            Self::TimeSlot(slot) => &slot.device_id,
            Self::Tag(tag) => &tag.device_id,
            Self::Domain(domain) => &domain.device_id,
            Self::DailyLog(log) => &log.device_id,
        }
    }
}

/// One intended remote-side effect, durably recorded at mutation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Unique event id
    pub id: String,
    /// Target collection
    pub kind: EntityKind,
    /// What the mutation did
    pub operation: Operation,
    /// Target entity id
    pub entity_id: String,
    /// Full entity snapshot at mutation time
    pub payload: EntityPayload,
    /// Deterministic key the remote uses to deduplicate retried pushes
    pub idempotency_key: String,
    /// Owner at mutation time
    pub owner_id: Option<String>,
    /// Originating client
    pub device_id: String,
    /// Delivery state
    pub status: OutboxStatus,
    /// Failed push attempts so far
    pub retry_count: i64,
    /// Message from the most recent failed attempt
    pub last_error: Option<String>,
    /// Event creation timestamp (Unix ms)
    pub created_at: i64,
    /// When the remote accepted this event (Unix ms)
    pub synced_at: Option<i64>,
}

impl OutboxEvent {
    /// Record a new pending event for the given operation and snapshot.
    #[must_use]
    pub fn record(operation: Operation, payload: EntityPayload) -> Self {
        let kind = payload.kind();
        let entity_id = payload.entity_id();
        let idempotency_key = idempotency_key(kind, operation, &entity_id, payload.updated_at());
        Self {
            id: Uuid::now_v7().to_string(),
            kind,
            operation,
            entity_id,
            owner_id: payload.owner_id().map(ToString::to_string),
            device_id: payload.device_id().to_string(),
            payload,
            idempotency_key,
            status: OutboxStatus::Pending,
            retry_count: 0,
            last_error: None,
            created_at: super::now_ms(),
            synced_at: None,
        }
    }
}

/// Deterministic idempotency key for a mutation.
///
/// Derived from kind + operation + entity id + the snapshot's `updated_at`,
/// so a retried push of the same logical event reuses the same key.
#[must_use]
pub fn idempotency_key(
    kind: EntityKind,
    operation: Operation,
    entity_id: &str,
    updated_at: i64,
) -> String {
    format!("{kind}:{operation}:{entity_id}:{updated_at}")
}
