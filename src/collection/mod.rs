//! Document Collections
//!
//! The document database the versioned store is persisted into:
//! - `DocumentCollection` - Contract: find, insert, array updates, upsert, indexes
//! - `MemoryCollection` - Volatile implementation
//! - `FileCollection` - Durable implementation over a checksummed operation log
//!
//! Documents are flat JSON objects addressed by an insertion-ordered
//! `_id`. Filters and updates cover only what the versioned store needs.

mod backend;
mod document;
mod errors;
mod file;
mod filter;
mod index;
mod memory;
mod record;

pub use backend::DocumentCollection;
pub use document::{Document, ObjectId, ID_FIELD};
pub use errors::{CollectionError, CollectionResult};
pub use file::FileCollection;
pub use filter::{Filter, FindOptions, SortOrder, Update};
pub use index::IndexModel;
pub use memory::MemoryCollection;
pub use record::{compute_checksum, Decoded, LogOp};
