//! Offline-first sync
//!
//! Local mutations record outbox events; [`PushEngine`] drains them to a
//! [`RemoteStore`], [`PullEngine`] applies remote changes behind a cursor,
//! and [`SyncEngine`] runs the loop.

mod config;
mod context;
mod engine;
pub mod mapper;
mod migrate;
mod pull;
mod push;
mod remote;

pub use config::SyncConfig;
pub use context::{
    ConnectivityProbe, OwnerProfile, OwnerProvider, SharedConnectivity, StaticOwner,
};
pub use engine::{SyncCycleSummary, SyncEngine, SyncStatus};
pub use migrate::{migrate_local_to_cloud, MigrationSummary};
pub use pull::{PullEngine, PullSummary};
pub use push::{PushEngine, PushSummary};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
