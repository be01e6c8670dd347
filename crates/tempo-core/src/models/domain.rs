//! Domain model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainId(Uuid);

impl DomainId {
    /// Create a new unique domain ID
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

impl Default for DomainId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DomainId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A life area grouping tags (e.g. Work, Health)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Unique identifier
    pub id: DomainId,
    /// Display name (uniqueness is case-insensitive among live domains)
    pub name: String,
    /// Display color (hex string)
    pub color: String,
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

impl Domain {
    /// Create a new domain with the given name and color
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        let now = super::now_ms();
        Self {
            id: DomainId::new(),
            name: name.into(),
            color: color.into(),
            owner_id: None,
            device_id: device_id.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this domain carries a soft-delete tombstone
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_new() {
        let domain = Domain::new("Work", "#AA3355", "device-1");
        assert_eq!(domain.name, "Work");
        assert!(!domain.is_deleted());
    }
}
