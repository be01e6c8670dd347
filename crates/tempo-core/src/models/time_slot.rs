//! Time slot model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::TagId;

/// A unique identifier for a time slot, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlotId(Uuid);

impl TimeSlotId {
    /// Create a new unique time slot ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TimeSlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimeSlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimeSlotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A tracked block of time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique identifier
    pub id: TimeSlotId,
    /// Slot start (Unix ms)
    pub start_time: i64,
    /// Slot end (Unix ms)
    pub end_time: i64,
    /// Free-form note
    pub note: Option<String>,
    /// Tags attached to this slot
    pub tag_ids: Vec<TagId>,
    /// Self-reported energy level
    pub energy: Option<i32>,
    /// Self-reported mood
    pub mood: Option<i32>,
    /// Local optimistic marker, bumped on every local update.
    /// Not consulted for conflict resolution.
    pub version: i64,
    /// Owning account, absent while anonymous/local-only
    pub owner_id: Option<String>,
    /// Originating client
    pub device_id: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms), authoritative for conflict comparison
    pub updated_at: i64,
    /// Soft-delete tombstone timestamp (Unix ms)
    pub deleted_at: Option<i64>,
}

impl TimeSlot {
    /// Create a new time slot covering `[start_time, end_time]`
    #[must_use]
    pub fn new(start_time: i64, end_time: i64, device_id: impl Into<String>) -> Self {
        let now = super::now_ms();
        Self {
            id: TimeSlotId::new(),
            start_time,
            end_time,
            note: None,
            tag_ids: Vec::new(),
            energy: None,
            mood: None,
            version: 1,
            owner_id: None,
            device_id: device_id.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this slot carries a soft-delete tombstone
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slot_id_unique() {
        let id1 = TimeSlotId::new();
        let id2 = TimeSlotId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_time_slot_id_parse() {
        let id = TimeSlotId::new();
        let parsed: TimeSlotId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_time_slot_new() {
        let slot = TimeSlot::new(1000, 2000, "device-1");
        assert_eq!(slot.start_time, 1000);
        assert_eq!(slot.end_time, 2000);
        assert_eq!(slot.version, 1);
        assert!(!slot.is_deleted());
        assert_eq!(slot.created_at, slot.updated_at);
        assert!(slot.owner_id.is_none());
    }
}
