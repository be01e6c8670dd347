//! Error types for tempo-core

use thiserror::Error;

/// Result type alias using tempo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tempo-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Domain still referenced by live tags
    #[error("Domain in use: {0}")]
    DomainInUse(String),

    /// Name collides case-insensitively within its scope
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Remote store transport failure (network, HTTP, server rejection)
    #[error("Remote error: {0}")]
    Remote(String),

    /// Mapper invoked with an unrecognized entity kind.
    ///
    /// This is a programming-error class: it means a mapping branch is
    /// missing and must fail loudly rather than be swallowed.
    #[error("Unsupported entity kind: {0}")]
    UnsupportedEntity(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
