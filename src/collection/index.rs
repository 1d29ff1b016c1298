//! Index declarations
//!
//! Indexes are declared by the collection's owner. Non-unique indexes
//! are advisory here; unique indexes are constraints, checked on every
//! write against the documents their partial filter covers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::Document;
use super::errors::CollectionError;
use super::filter::Filter;

/// A declared index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexModel {
    pub name: String,
    pub keys: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    /// Restricts the index to matching documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<Filter>,
}

impl IndexModel {
    pub fn new<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            unique: false,
            partial: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn partial(mut self, filter: Filter) -> Self {
        self.partial = Some(filter);
        self
    }

    /// True if the document is covered by this index.
    pub fn covers(&self, doc: &Document) -> bool {
        self.partial.as_ref().map_or(true, |f| f.matches(doc))
    }

    /// Key tuple of the document; missing fields index as null.
    pub fn key_of(&self, doc: &Document) -> Vec<Value> {
        self.keys
            .iter()
            .map(|k| doc.get(k).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Checks `candidate` against every other covered document.
    ///
    /// `others` must not contain the candidate's previous revision.
    pub fn check_unique<'a>(
        &self,
        candidate: &Document,
        others: impl IntoIterator<Item = &'a Document>,
    ) -> Result<(), CollectionError> {
        if !self.unique || !self.covers(candidate) {
            return Ok(());
        }
        let key = self.key_of(candidate);
        let clash = others
            .into_iter()
            .any(|doc| self.covers(doc) && self.key_of(doc) == key);
        if clash {
            return Err(CollectionError::DuplicateKey {
                index: self.name.clone(),
                key: Value::Array(key).to_string(),
            });
        }
        Ok(())
    }
}
