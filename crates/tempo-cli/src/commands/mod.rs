pub mod auth;
pub mod common;
pub mod domain;
pub mod log;
pub mod outbox;
pub mod slot;
pub mod sync;
pub mod tag;
