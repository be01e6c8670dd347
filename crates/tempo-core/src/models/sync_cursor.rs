//! Sync cursor model

use serde::{Deserialize, Serialize};

/// Singleton watermark marking the boundary of already-pulled remote data.
///
/// Absent until the first successful pull; reset whenever the authenticated
/// owner changes so one account's incremental window never leaks into
/// another's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Opaque server-comparable timestamp (RFC 3339) of the last pull
    pub last_pull_cursor: Option<String>,
    /// When the last pull cycle ran (Unix ms)
    pub last_pull_at: Option<i64>,
    /// When the last push batch completed (Unix ms)
    pub last_push_at: Option<i64>,
    /// Owner the cursor belongs to
    pub owner_id: Option<String>,
}

impl SyncCursor {
    /// Whether the stored cursor is usable for the given owner.
    ///
    /// A cursor recorded under a different owner is treated as absent
    /// (first-sync semantics).
    #[must_use]
    pub fn cursor_for_owner(&self, owner_id: &str) -> Option<&str> {
        if self.owner_id.as_deref() == Some(owner_id) {
            self.last_pull_cursor.as_deref()
        } else {
            None
        }
    }
}
