//! # Versioned Store Errors
//!
//! Error codes:
//! - AERO_VSTORE_NOT_FOUND
//! - AERO_VSTORE_ARCHIVED
//! - AERO_VSTORE_CODEC
//! - AERO_VSTORE_INTERNAL

use thiserror::Error;

use crate::collection::CollectionError;

/// Result type for versioned store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Versioned store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Nothing matches the requested selector or filter
    #[error("Not found")]
    NotFound,

    /// Mutation attempted on an archived identity
    #[error("Identity is archived")]
    Archived,

    /// Payload or metadata could not be converted to or from a document
    #[error("Codec error: {0}")]
    Codec(String),

    /// Underlying storage failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound => "AERO_VSTORE_NOT_FOUND",
            StoreError::Archived => "AERO_VSTORE_ARCHIVED",
            StoreError::Codec(_) => "AERO_VSTORE_CODEC",
            StoreError::Internal(_) => "AERO_VSTORE_INTERNAL",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, StoreError::Archived)
    }
}

impl From<CollectionError> for StoreError {
    fn from(e: CollectionError) -> Self {
        StoreError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(StoreError::NotFound.code(), "AERO_VSTORE_NOT_FOUND");
        assert_eq!(StoreError::Archived.code(), "AERO_VSTORE_ARCHIVED");
        assert_eq!(StoreError::Internal("x".into()).code(), "AERO_VSTORE_INTERNAL");
    }

    #[test]
    fn test_archived_distinct_from_not_found() {
        assert!(StoreError::Archived.is_archived());
        assert!(!StoreError::Archived.is_not_found());
        assert!(StoreError::NotFound.is_not_found());
    }

    #[test]
    fn test_collection_errors_are_internal() {
        let err: StoreError = CollectionError::DuplicateKey {
            index: "id_version".into(),
            key: "[]".into(),
        }
        .into();
        assert!(matches!(err, StoreError::Internal(msg) if msg.contains("id_version")));
    }
}
