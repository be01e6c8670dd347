use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tempo_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid timestamp '{0}', expected RFC 3339 (e.g. 2026-08-28T09:00:00Z)")]
    InvalidTimestamp(String),
    #[error("No slot found for id/prefix: {0}")]
    SlotNotFound(String),
    #[error("Ambiguous slot id prefix: {0}")]
    AmbiguousSlotId(String),
    #[error("No tag named '{0}'")]
    TagNotFound(String),
    #[error("No domain named '{0}'")]
    DomainNotFound(String),
    #[error("Could not determine a data directory; pass --db-path")]
    NoDataDir,
    #[error(
        "Sync is not configured. Set TEMPO_REMOTE_URL and TEMPO_API_KEY to enable the remote store."
    )]
    SyncNotConfigured,
    #[error("Not logged in. Run `tempo login <owner-id>` first.")]
    NotLoggedIn,
}
