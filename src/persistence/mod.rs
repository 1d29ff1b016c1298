//! Durable storage of versioned values
//!
//! - `VersionedCollection` - History operations over any `DocumentCollection`
//! - `DocumentCodec` / `Meta` - Stored document layout
//! - `StoreError` - NotFound / Archived / Codec / Internal
//!
//! Archived identities reject every mutation with `StoreError::Archived`
//! while reads keep working.

mod adapter;
mod encoding;
mod errors;

pub use adapter::{Page, Pagination, VersionedCollection, DEFAULT_ID_KEY};
pub use encoding::{
    DocumentCodec, Meta, MARKER_KEY, PARENTS_KEY, REFS_KEY, RESERVED_KEYS, VERSION_KEY,
};
pub use errors::{StoreError, StoreResult};
