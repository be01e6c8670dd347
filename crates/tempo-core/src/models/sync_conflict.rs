//! Sync conflict model

use serde::{Deserialize, Serialize};

use super::EntityKind;

/// Append-only audit entry recorded when a pull overwrites a local copy
/// that was modified more recently than the incoming remote snapshot.
///
/// Remote-wins is deterministic; the record exists so the overwrite is not
/// silent. Never mutated or auto-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Conflict row identifier
    pub id: i64,
    /// Affected collection
    pub kind: EntityKind,
    /// Affected entity
    pub entity_id: String,
    /// Full local snapshot at conflict time
    pub local_snapshot: serde_json::Value,
    /// Full remote snapshot that won
    pub remote_snapshot: serde_json::Value,
    /// Detection timestamp (Unix ms)
    pub detected_at: i64,
}
