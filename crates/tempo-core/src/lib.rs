//! tempo-core - Core library for Tempo
//!
//! This crate contains the shared models, database layer, mutation
//! services, and the offline-first sync engine used by all Tempo
//! interfaces.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sync;

pub use error::{Error, Result};
pub use models::{
    DailyLog, DailyLogId, Domain, DomainId, EntityKind, Tag, TagId, TimeSlot, TimeSlotId,
};
pub use services::TrackerService;
pub use sync::{SyncConfig, SyncEngine};
