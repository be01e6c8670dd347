//! Daily log model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a daily log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DailyLogId(Uuid);

impl DailyLogId {
    /// Create a new unique daily log ID
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

impl Default for DailyLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DailyLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DailyLogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// An end-of-day reflection entry, one per calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    /// Unique identifier
    pub id: DailyLogId,
    /// Calendar date (`YYYY-MM-DD`)
    pub date: String,
    /// Free-form reflection text
    pub reflection: String,
    /// Short highlight lines for the day
    pub highlights: Vec<String>,
    /// Owning account, absent while anonymous/local-only
    pub owner_id: Option<String>,
    /// Originating client
    pub device_id: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Soft-delete tombstone timestamp (Unix ms)
    pub deleted_at: Option<i64>,
}

impl DailyLog {
    /// Create a new daily log for the given calendar date
    #[must_use]
    pub fn new(date: impl Into<String>, device_id: impl Into<String>) -> Self {
        let now = super::now_ms();
        Self {
            id: DailyLogId::new(),
            date: date.into(),
            reflection: String::new(),
            highlights: Vec::new(),
            owner_id: None,
            device_id: device_id.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this log carries a soft-delete tombstone
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
