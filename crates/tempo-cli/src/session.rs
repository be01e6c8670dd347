//! Persisted CLI session
//!
//! One small JSON file next to the database: the device id minted on
//! first run and the owner id while logged in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CliError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Logged-in account, if any
    pub owner_id: Option<String>,
    /// Stable identifier for this install
    pub device_id: String,
}

impl Session {
    fn fresh() -> Self {
        Self {
            owner_id: None,
            device_id: Uuid::now_v7().to_string(),
        }
    }
}

pub fn session_path(db_path: &Path) -> PathBuf {
    db_path.with_file_name("session.json")
}

/// Load the session, minting one on first run
pub fn load(db_path: &Path) -> Result<Session, CliError> {
    let path = session_path(db_path);
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    } else {
        let session = Session::fresh();
        save(db_path, &session)?;
        Ok(session)
    }
}

pub fn save(db_path: &Path, session: &Session) -> Result<(), CliError> {
    let path = session_path(db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}
