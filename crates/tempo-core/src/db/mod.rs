//! Database layer

mod connection;
mod migrations;
mod outbox_repository;
mod repository;
mod sync_repository;

pub use connection::Database;
pub use outbox_repository::OutboxRepository;
pub use repository::{DailyLogRepository, DomainRepository, TagRepository, TimeSlotRepository};
pub use sync_repository::SyncRepository;
