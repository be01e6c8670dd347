//! Tag model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DomainId;

/// A unique identifier for a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagId(Uuid);

impl TagId {
    /// Create a new unique tag ID
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

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TagId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A tag for categorizing time slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: TagId,
    /// Display name (uniqueness is case-insensitive within a domain)
    pub name: String,
    /// Display color (hex string, e.g. `#4A90D9`)
    pub color: String,
    /// Owning domain, if any
    pub domain_id: Option<DomainId>,
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

impl Tag {
    /// Create a new tag with the given name and color
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        let now = super::now_ms();
        Self {
            id: TagId::new(),
            name: name.into(),
            color: color.into(),
            domain_id: None,
            owner_id: None,
            device_id: device_id.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this tag carries a soft-delete tombstone
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
