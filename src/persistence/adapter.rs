//! Versioned collection
//!
//! Maps an identity's history onto one document per version inside a
//! `DocumentCollection`. Refs live in the `__r` array of the document
//! they point at; a ref move is a pull from every holder followed by an
//! add-to-set on the destination.
//!
//! The two steps are separate writes. A failure between them leaves the
//! ref unbound, never duplicated.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::encoding::{DocumentCodec, Meta, MARKER_KEY, PARENTS_KEY, REFS_KEY, VERSION_KEY};
use super::errors::{StoreError, StoreResult};
use crate::collection::{
    Document, DocumentCollection, Filter, FindOptions, IndexModel, ObjectId, SortOrder, Update,
    ID_FIELD,
};
use crate::observability::{log_event, Event};
use crate::value::{Query, Value, Values};
use crate::version::{Ref, Version, VersionOrRef};

/// Default document field holding the identity.
pub const DEFAULT_ID_KEY: &str = "id";

/// Window over a result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// One window of results plus the size of the whole result set.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<Value<T>>,
    pub total: u64,
    pub offset: usize,
    pub limit: usize,
}

/// Versioned values of type `T` stored in a document collection.
pub struct VersionedCollection<T, C> {
    collection: C,
    codec: DocumentCodec,
    _payload: PhantomData<fn() -> T>,
}

impl<T, C> VersionedCollection<T, C>
where
    T: Serialize + DeserializeOwned + Clone,
    C: DocumentCollection,
{
    /// Wraps a collection whose identity field is `id`.
    pub fn new(collection: C) -> Self {
        Self::with_id_key(collection, DEFAULT_ID_KEY)
    }

    pub fn with_id_key(collection: C, id_key: impl Into<String>) -> Self {
        Self {
            collection,
            codec: DocumentCodec::new(id_key),
            _payload: PhantomData,
        }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    pub fn id_key(&self) -> &str {
        self.codec.id_key()
    }

    /// Filter matching every stored document of one identity.
    pub fn identity(&self, id: &str) -> Filter {
        Filter::eq(self.id_key(), id)
    }

    /// Identity fields of `id`, as taken by `is_archived` and `archive_one`.
    pub fn identity_document(&self, id: &str) -> Document {
        let mut doc = Document::new();
        doc.insert(self.id_key().to_string(), Json::String(id.to_string()));
        doc
    }

    /// Declares the indexes the store relies on. Safe to call repeatedly.
    pub fn ensure_indexes(&self) -> StoreResult<()> {
        let id_key = self.id_key();
        let indexes = [
            IndexModel::new("id_version", [id_key, VERSION_KEY]).unique(),
            IndexModel::new("id_archived", [id_key, MARKER_KEY])
                .unique()
                .partial(Filter::exists(MARKER_KEY, true)),
            IndexModel::new("id_refs", [id_key, REFS_KEY]),
            IndexModel::new("refs", [REFS_KEY]),
            IndexModel::new("parents", [PARENTS_KEY]),
        ];
        for index in indexes {
            self.collection.create_index(index)?;
        }

        log_event(Event::IndexesEnsured, &[("collection", self.collection.name())]);
        Ok(())
    }

    /// Caller filter narrowed to version documents selected by `query`.
    fn version_filter(filter: &Filter, query: &Query) -> Filter {
        let selected = match query {
            Query::All => Filter::All,
            Query::Eq(vr) => selector_filter(vr),
        };
        filter
            .clone()
            .and(selected)
            .and(Filter::exists(MARKER_KEY, false))
    }

    fn decode(&self, doc: Document) -> StoreResult<Value<T>> {
        self.codec.decode(doc)
    }

    /// Most recent version matching `filter` and `query`.
    pub fn find_one(&self, filter: &Filter, query: &Query) -> StoreResult<Value<T>> {
        let options = FindOptions::default().sort(ID_FIELD, SortOrder::Descending);
        match self
            .collection
            .find_one(&Self::version_filter(filter, query), &options)?
        {
            Some(doc) => self.decode(doc),
            None => Err(StoreError::NotFound),
        }
    }

    /// Every version matching `filter` and `query`, oldest first.
    pub fn find(&self, filter: &Filter, query: &Query) -> StoreResult<Vec<Value<T>>> {
        self.find_with(filter, query, &FindOptions::default())
    }

    fn find_with(
        &self,
        filter: &Filter,
        query: &Query,
        options: &FindOptions,
    ) -> StoreResult<Vec<Value<T>>> {
        self.collection
            .find(&Self::version_filter(filter, query), options)?
            .into_iter()
            .map(|doc| self.decode(doc))
            .collect()
    }

    /// One window of `find`, newest first.
    pub fn paginate(
        &self,
        filter: &Filter,
        query: &Query,
        pagination: &Pagination,
    ) -> StoreResult<Page<T>> {
        let options = FindOptions::default()
            .sort(ID_FIELD, SortOrder::Descending)
            .skip(pagination.offset)
            .limit(pagination.limit);
        let items = self.find_with(filter, query, &options)?;
        let total = self.count(filter, query)?;
        Ok(Page {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    pub fn count(&self, filter: &Filter, query: &Query) -> StoreResult<u64> {
        Ok(self
            .collection
            .count(&Self::version_filter(filter, query))?)
    }

    /// Creation time of the newest matching version.
    pub fn timestamp(&self, filter: &Filter, query: &Query) -> StoreResult<DateTime<Utc>> {
        let options = FindOptions::default()
            .sort(ID_FIELD, SortOrder::Descending)
            .project([ID_FIELD]);
        self.collection
            .find_one(&Self::version_filter(filter, query), &options)?
            .as_ref()
            .and_then(ObjectId::of)
            .map(|id| id.timestamp())
            .ok_or(StoreError::NotFound)
    }

    fn marker_filter(filter: &Document) -> Filter {
        Filter::from_document(filter).and(Filter::eq(MARKER_KEY, true))
    }

    /// True if an archive marker exists for the identity fields in `filter`.
    pub fn is_archived(&self, filter: &Document) -> StoreResult<bool> {
        Ok(self.collection.count(&Self::marker_filter(filter))? > 0)
    }

    /// Sets or clears the archive marker. Idempotent.
    pub fn archive_one(&self, filter: &Document, archived: bool) -> StoreResult<()> {
        let marker = Self::marker_filter(filter);
        if archived {
            let mut doc = filter.clone();
            doc.insert(MARKER_KEY.to_string(), Json::Bool(true));
            self.collection.replace_one(&marker, doc, true)?;
        } else {
            self.collection.delete_many(&marker)?;
        }

        let archived = archived.to_string();
        log_event(
            Event::ArchiveSet,
            &[
                ("collection", self.collection.name()),
                ("archived", archived.as_str()),
            ],
        );
        Ok(())
    }

    fn check_writable(&self, id: &str) -> StoreResult<()> {
        if self.is_archived(&self.identity_document(id))? {
            log_event(
                Event::WriteRejectedArchived,
                &[("collection", self.collection.name()), ("id", id)],
            );
            return Err(StoreError::Archived);
        }
        Ok(())
    }

    /// Metadata of the version of `id` selected by `vr`, if any.
    pub fn find_meta(&self, id: &str, vr: &VersionOrRef) -> StoreResult<Option<Meta>> {
        let filter = self
            .identity(id)
            .and(selector_filter(vr))
            .and(Filter::exists(MARKER_KEY, false));
        let options = FindOptions::default()
            .sort(ID_FIELD, SortOrder::Descending)
            .project([VERSION_KEY, PARENTS_KEY, REFS_KEY]);
        self.collection
            .find_one(&filter, &options)?
            .map(|doc| Meta::read(&doc))
            .transpose()
    }

    /// Removes `r` from every version of `id` holding it.
    fn pull_ref(&self, id: &str, r: &Ref) -> StoreResult<u64> {
        let holders = self.identity(id).and(Filter::contains(REFS_KEY, r.as_str()));
        Ok(self
            .collection
            .update_many(&holders, &Update::pull(REFS_KEY, r.as_str()))?)
    }

    /// Stores `payload` as a new version of `id` branching from `parent`
    /// (`latest` when omitted).
    ///
    /// A ref parent moves onto the new version. The first save of an
    /// identity needs no parent and starts `latest`.
    pub fn save_one(
        &self,
        id: &str,
        payload: &T,
        parent: Option<VersionOrRef>,
    ) -> StoreResult<Version> {
        self.check_writable(id)?;

        let parent = match parent {
            Some(vr) if !vr.is_empty() => vr,
            _ => VersionOrRef::latest(),
        };
        let found = self.find_meta(id, &parent)?;
        if found.is_none() && !parent.is_ref(&Ref::LATEST) {
            return Err(StoreError::NotFound);
        }

        let mut meta = Meta::new(Version::new());
        meta.parents = found.map(|m| vec![m.version]);
        if let VersionOrRef::Ref(r) = &parent {
            meta.refs = Some(vec![r.clone()]);
        }
        let doc = self.codec.encode(id, payload, &meta)?;

        if let VersionOrRef::Ref(r) = &parent {
            self.pull_ref(id, r)?;
        }
        self.collection.insert_one(doc)?;

        let (version, parent) = (meta.version.to_string(), parent.to_string());
        log_event(
            Event::VersionSaved,
            &[
                ("collection", self.collection.name()),
                ("id", id),
                ("version", version.as_str()),
                ("parent", parent.as_str()),
            ],
        );
        Ok(meta.version)
    }

    /// Points `r` at the version `dest` selects, or unbinds it when
    /// `dest` is `None`.
    pub fn update_ref(&self, id: &str, r: &Ref, dest: Option<&VersionOrRef>) -> StoreResult<()> {
        self.check_writable(id)?;

        let target = match dest {
            Some(vr) => Some(self.find_meta(id, vr)?.ok_or(StoreError::NotFound)?),
            None => None,
        };

        self.pull_ref(id, r)?;
        if let Some(meta) = &target {
            let filter = self
                .identity(id)
                .and(Filter::eq(VERSION_KEY, meta.version.to_base64()));
            self.collection
                .update_one(&filter, &Update::add_to_set(REFS_KEY, r.as_str()))?;
        }

        let dest = target
            .map(|m| m.version.to_string())
            .unwrap_or_else(|| "none".to_string());
        log_event(
            Event::RefMoved,
            &[
                ("collection", self.collection.name()),
                ("id", id),
                ("ref", r.as_str()),
                ("dest", dest.as_str()),
            ],
        );
        Ok(())
    }

    /// Whole history of `id` with its archive flag.
    pub fn load(&self, id: &str) -> StoreResult<Values<T>> {
        let list = self.find(&self.identity(id), &Query::All)?;
        let archived = self.is_archived(&self.identity_document(id))?;
        Values::new(list, archived)
            .ok_or_else(|| StoreError::Internal(format!("stored history of '{}' is inconsistent", id)))
    }

    /// Deletes every document matching `filter`, markers included.
    pub fn remove_one(&self, filter: &Filter) -> StoreResult<u64> {
        let removed = self.collection.delete_many(filter)?;

        let count = removed.to_string();
        log_event(
            Event::Removed,
            &[
                ("collection", self.collection.name()),
                ("documents", count.as_str()),
            ],
        );
        Ok(removed)
    }

    /// Deletes every document. Indexes survive.
    pub fn empty(&self) -> StoreResult<()> {
        self.collection.drop_all()?;
        log_event(Event::Emptied, &[("collection", self.collection.name())]);
        Ok(())
    }
}

/// Storage predicate selecting the document a `VersionOrRef` names.
fn selector_filter(vr: &VersionOrRef) -> Filter {
    match vr {
        VersionOrRef::Version(v) => Filter::eq(VERSION_KEY, v.to_base64()),
        VersionOrRef::Ref(r) => Filter::contains(REFS_KEY, r.as_str()),
    }
}
