//! In-memory document collection
//!
//! Documents live in a vector in insertion order behind an `RwLock`.
//! Used directly in tests and as the replay target of `FileCollection`.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::backend::DocumentCollection;
use super::document::{ensure_id, Document, ObjectId, ID_FIELD};
use super::errors::{CollectionError, CollectionResult};
use super::filter::{Filter, FindOptions, Update};
use super::index::IndexModel;
use super::record::LogOp;

#[derive(Debug, Default)]
struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<IndexModel>,
}

/// What it takes to take back one applied operation.
#[derive(Debug)]
enum Undo {
    Nothing,
    /// Drop documents appended past this length.
    Truncate(usize),
    /// Put back the previous contents of changed positions.
    Restore(Vec<(usize, Document)>),
    /// Re-insert removed documents at their positions, ascending.
    Reinsert(Vec<(usize, Document)>),
    Documents(Vec<Document>),
    Indexes(Vec<IndexModel>),
}

impl CollectionState {
    /// Checks every unique index for `candidate`, ignoring the document
    /// at `replacing`.
    fn check_unique(&self, candidate: &Document, replacing: Option<usize>) -> CollectionResult<()> {
        for index in &self.indexes {
            let others = self
                .documents
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != replacing)
                .map(|(_, d)| d);
            index.check_unique(candidate, others)?;
        }
        Ok(())
    }

    fn insert(&mut self, mut doc: Document) -> CollectionResult<(ObjectId, Undo)> {
        let id = ensure_id(&mut doc);
        self.check_unique(&doc, None)?;
        let undo = Undo::Truncate(self.documents.len());
        self.documents.push(doc);
        Ok((id, undo))
    }

    fn update(&mut self, filter: &Filter, update: &Update, many: bool) -> CollectionResult<(u64, Undo)> {
        let targets: Vec<usize> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, d)| filter.matches(d))
            .map(|(i, _)| i)
            .take(if many { usize::MAX } else { 1 })
            .collect();

        // Stage every change before committing any of them.
        let mut staged = Vec::with_capacity(targets.len());
        for &i in &targets {
            let mut doc = self.documents[i].clone();
            update.apply(&mut doc)?;
            self.check_unique(&doc, Some(i))?;
            staged.push((i, doc));
        }
        let previous = staged
            .into_iter()
            .map(|(i, doc)| (i, std::mem::replace(&mut self.documents[i], doc)))
            .collect();
        Ok((targets.len() as u64, Undo::Restore(previous)))
    }

    fn replace(&mut self, filter: &Filter, mut doc: Document, upsert: bool) -> CollectionResult<(u64, Undo)> {
        match self.documents.iter().position(|d| filter.matches(d)) {
            Some(i) => {
                if let Some(id) = self.documents[i].get(ID_FIELD).cloned() {
                    doc.insert(ID_FIELD.to_string(), id);
                }
                self.check_unique(&doc, Some(i))?;
                let previous = std::mem::replace(&mut self.documents[i], doc);
                Ok((1, Undo::Restore(vec![(i, previous)])))
            }
            None if upsert => self.insert(doc).map(|(_, undo)| (1, undo)),
            None => Ok((0, Undo::Nothing)),
        }
    }

    fn delete(&mut self, filter: &Filter) -> (u64, Undo) {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.documents.len());
        for (i, doc) in std::mem::take(&mut self.documents).into_iter().enumerate() {
            if filter.matches(&doc) {
                removed.push((i, doc));
            } else {
                kept.push(doc);
            }
        }
        self.documents = kept;
        (removed.len() as u64, Undo::Reinsert(removed))
    }

    fn create_index(&mut self, index: IndexModel) -> CollectionResult<Undo> {
        if index.unique {
            for (i, doc) in self.documents.iter().enumerate() {
                let earlier = self.documents[..i].iter();
                index.check_unique(doc, earlier)?;
            }
        }
        let previous = self.indexes.clone();
        self.indexes.retain(|existing| existing.name != index.name);
        self.indexes.push(index);
        Ok(Undo::Indexes(previous))
    }

    /// Applies one logged operation, returning how many documents it
    /// changed. Inserts, drops and index declarations count as one.
    fn apply(&mut self, op: &LogOp) -> CollectionResult<(u64, Undo)> {
        match op {
            LogOp::Insert { document } => self.insert(document.clone()).map(|(_, undo)| (1, undo)),
            LogOp::UpdateOne { filter, update } => self.update(filter, update, false),
            LogOp::UpdateMany { filter, update } => self.update(filter, update, true),
            LogOp::Replace {
                filter,
                document,
                upsert,
            } => self.replace(filter, document.clone(), *upsert),
            LogOp::Delete { filter } => Ok(self.delete(filter)),
            LogOp::Drop => Ok((1, Undo::Documents(std::mem::take(&mut self.documents)))),
            LogOp::CreateIndex { index } => self.create_index(index.clone()).map(|undo| (1, undo)),
        }
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Nothing => {}
            Undo::Truncate(len) => self.documents.truncate(len),
            Undo::Restore(previous) => {
                for (i, doc) in previous {
                    self.documents[i] = doc;
                }
            }
            Undo::Reinsert(removed) => {
                for (i, doc) in removed {
                    self.documents.insert(i, doc);
                }
            }
            Undo::Documents(documents) => self.documents = documents,
            Undo::Indexes(indexes) => self.indexes = indexes,
        }
    }
}

/// Collection held entirely in memory.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    state: RwLock<CollectionState>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Number of stored documents, markers included.
    pub fn len(&self) -> CollectionResult<usize> {
        Ok(self.read()?.documents.len())
    }

    pub fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Applies a logged operation.
    pub(crate) fn apply(&self, op: &LogOp) -> CollectionResult<u64> {
        self.write()?.apply(op).map(|(changed, _)| changed)
    }

    /// Applies `op`, then runs `commit` with the change count while still
    /// holding the write lock. If `commit` fails the operation is taken
    /// back before any reader can see it.
    pub(crate) fn apply_then<F>(&self, op: &LogOp, commit: F) -> CollectionResult<u64>
    where
        F: FnOnce(u64) -> CollectionResult<()>,
    {
        let mut state = self.write()?;
        let (changed, undo) = state.apply(op)?;
        if let Err(e) = commit(changed) {
            state.revert(undo);
            return Err(e);
        }
        Ok(changed)
    }

    fn read(&self) -> CollectionResult<RwLockReadGuard<'_, CollectionState>> {
        self.state
            .read()
            .map_err(|_| CollectionError::Internal("Lock poisoned".to_string()))
    }

    fn write(&self) -> CollectionResult<RwLockWriteGuard<'_, CollectionState>> {
        self.state
            .write()
            .map_err(|_| CollectionError::Internal("Lock poisoned".to_string()))
    }
}

impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert_one(&self, doc: Document) -> CollectionResult<ObjectId> {
        self.write()?.insert(doc).map(|(id, _)| id)
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> CollectionResult<Vec<Document>> {
        let state = self.read()?;
        let matched = state
            .documents
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        Ok(options.shape(matched))
    }

    fn count(&self, filter: &Filter) -> CollectionResult<u64> {
        let state = self.read()?;
        Ok(state.documents.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> CollectionResult<u64> {
        self.write()?.update(filter, update, false).map(|(n, _)| n)
    }

    fn update_many(&self, filter: &Filter, update: &Update) -> CollectionResult<u64> {
        self.write()?.update(filter, update, true).map(|(n, _)| n)
    }

    fn replace_one(&self, filter: &Filter, doc: Document, upsert: bool) -> CollectionResult<u64> {
        self.write()?.replace(filter, doc, upsert).map(|(n, _)| n)
    }

    fn delete_many(&self, filter: &Filter) -> CollectionResult<u64> {
        Ok(self.write()?.delete(filter).0)
    }

    fn drop_all(&self) -> CollectionResult<()> {
        self.write()?.documents.clear();
        Ok(())
    }

    fn create_index(&self, index: IndexModel) -> CollectionResult<()> {
        self.write()?.create_index(index).map(|_| ())
    }

    fn indexes(&self) -> CollectionResult<Vec<IndexModel>> {
        Ok(self.read()?.indexes.clone())
    }
}
