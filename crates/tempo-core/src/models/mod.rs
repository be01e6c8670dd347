//! Data models for Tempo

mod daily_log;
mod domain;
mod outbox;
mod sync_conflict;
mod sync_cursor;
mod tag;
mod time_slot;

pub use daily_log::{DailyLog, DailyLogId};
pub use domain::{Domain, DomainId};
pub use outbox::{EntityPayload, Operation, OutboxEvent, OutboxStatus};
pub use sync_conflict::ConflictRecord;
pub use sync_cursor::SyncCursor;
pub use tag::{Tag, TagId};
pub use time_slot::{TimeSlot, TimeSlotId};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four synchronized entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    TimeSlot,
    Tag,
    Domain,
    DailyLog,
}

impl EntityKind {
    /// All kinds, in the order sync cycles process them. Domains come
    /// before tags and tags before slots so references land after their
    /// targets.
    pub const ALL: [Self; 4] = [Self::Domain, Self::Tag, Self::TimeSlot, Self::DailyLog];

    /// Stable string code used in the outbox and conflict tables.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TimeSlot => "time_slot",
            Self::Tag => "tag",
            Self::Domain => "domain",
            Self::DailyLog => "daily_log",
        }
    }

    /// Remote table name for this kind.
    pub const fn remote_table(self) -> &'static str {
        match self {
            Self::TimeSlot => "time_slots",
            Self::Tag => "tags",
            Self::Domain => "domains",
            Self::DailyLog => "daily_logs",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "time_slot" => Ok(Self::TimeSlot),
            "tag" => Ok(Self::Tag),
            "domain" => Ok(Self::Domain),
            "daily_log" => Ok(Self::DailyLog),
            other => Err(crate::Error::UnsupportedEntity(other.to_string())),
        }
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_roundtrip() {
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn entity_kind_unknown_fails_loudly() {
        let err = "widget".parse::<EntityKind>().unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedEntity(_)));
    }
}
