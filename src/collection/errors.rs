//! # Collection Errors

use std::io;

use thiserror::Error;

/// Result type for collection operations
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Document collection errors
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    // Constraint errors
    #[error("Duplicate key on index {index}: {key}")]
    DuplicateKey { index: String, key: String },

    #[error("Invalid update of field '{field}': {reason}")]
    InvalidUpdate { field: String, reason: String },

    // Durability errors
    #[error("Log corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollectionError {
    /// Returns whether this error means durable state can no longer be
    /// trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollectionError::Corruption { .. })
    }
}

impl From<io::Error> for CollectionError {
    fn from(e: io::Error) -> Self {
        CollectionError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(e: serde_json::Error) -> Self {
        CollectionError::Serialization(e.to_string())
    }
}
