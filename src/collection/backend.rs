//! Document collection contract
//!
//! The operations the versioned store needs from a document database.
//! Each call is one independent round trip: there are no multi-call
//! transactions, and no call blocks on another caller's writes beyond
//! the backend's own internal locking.

use super::document::{Document, ObjectId};
use super::errors::CollectionResult;
use super::filter::{Filter, FindOptions, Update};
use super::index::IndexModel;

/// A named collection of JSON documents.
pub trait DocumentCollection: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Inserts a document, assigning `_id` unless it already has one.
    fn insert_one(&self, doc: Document) -> CollectionResult<ObjectId>;

    /// Returns matching documents shaped by `options`.
    fn find(&self, filter: &Filter, options: &FindOptions) -> CollectionResult<Vec<Document>>;

    /// Returns the first matching document.
    fn find_one(&self, filter: &Filter, options: &FindOptions) -> CollectionResult<Option<Document>> {
        let options = FindOptions {
            limit: Some(1),
            ..options.clone()
        };
        Ok(self.find(filter, &options)?.into_iter().next())
    }

    fn count(&self, filter: &Filter) -> CollectionResult<u64>;

    /// Updates the first matching document. Returns the match count.
    fn update_one(&self, filter: &Filter, update: &Update) -> CollectionResult<u64>;

    /// Updates every matching document. Returns the match count.
    fn update_many(&self, filter: &Filter, update: &Update) -> CollectionResult<u64>;

    /// Replaces the first matching document, keeping its `_id`, or
    /// inserts `doc` when nothing matches and `upsert` is set.
    fn replace_one(&self, filter: &Filter, doc: Document, upsert: bool) -> CollectionResult<u64>;

    /// Deletes every matching document. Returns the delete count.
    fn delete_many(&self, filter: &Filter) -> CollectionResult<u64>;

    /// Deletes every document. Index declarations survive.
    fn drop_all(&self) -> CollectionResult<()>;

    /// Declares an index. Redeclaring an index by name replaces it.
    fn create_index(&self, index: IndexModel) -> CollectionResult<()>;

    fn indexes(&self) -> CollectionResult<Vec<IndexModel>>;
}
