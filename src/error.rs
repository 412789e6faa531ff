//! Typed errors for the memory subsystem.
//!
//! The routing layer maps [`MemoryError::PermissionDenied`] and
//! [`MemoryError::NotFound`] to client errors and everything else to a
//! generic server error. Embedding and store failures surface unmodified —
//! there is no automatic rollback of an earlier step; `reindex` is the
//! recovery mechanism for the rare inconsistency this can leave behind.

use thiserror::Error;

/// Errors produced by the memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The embedding provider could not produce a vector. Nothing was mutated.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The metadata record store reported a failure.
    #[error("metadata store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The snapshot pair could not be written or read.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] std::io::Error),

    /// Caller is neither the record's owner nor an admin.
    #[error("permission denied for memory {id}")]
    PermissionDenied { id: String },

    /// No record exists with the given id.
    #[error("memory not found: {id}")]
    NotFound { id: String },

    /// The vector index and position map disagree. Mutating operations must
    /// fully succeed or be treated as failed; search recovers locally instead.
    #[error("index inconsistency: {0}")]
    Inconsistent(String),

    /// A stored value could not be decoded (tags, metadata, embedding blob).
    #[error("corrupt record field: {0}")]
    Decode(String),

    /// Invalid configuration or request parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
