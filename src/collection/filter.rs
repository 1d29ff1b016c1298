//! Filters, updates and find options
//!
//! A deliberately small predicate language over top-level document
//! fields: equality, array membership, presence, and conjunction. Array
//! updates cover the two set operations ref moves need.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{Document, ID_FIELD};
use super::errors::{CollectionError, CollectionResult};

/// Predicate over a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field is present and equal to the value.
    Eq(String, Value),
    /// Field is an array containing the value.
    Contains(String, Value),
    /// Field presence equals the flag.
    Exists(String, bool),
    /// Every inner filter matches.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Contains(field.into(), value.into())
    }

    pub fn exists(field: impl Into<String>, present: bool) -> Self {
        Filter::Exists(field.into(), present)
    }

    /// Conjunction of one equality per document field.
    pub fn from_document(doc: &Document) -> Self {
        Filter::And(
            doc.iter()
                .map(|(k, v)| Filter::Eq(k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Combines two filters, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Filter::All => {}
                Filter::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Filter::All,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::Contains(field, value) => match doc.get(field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
            Filter::Exists(field, present) => doc.contains_key(field) == *present,
            Filter::And(inner) => inner.iter().all(|f| f.matches(doc)),
        }
    }
}

/// Modification applied to matched documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "snake_case")]
pub enum Update {
    /// Appends the value to the array field unless already present.
    /// A missing field becomes a one-element array.
    AddToSet(String, Value),
    /// Removes every occurrence of the value from the array field.
    Pull(String, Value),
}

impl Update {
    pub fn add_to_set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::AddToSet(field.into(), value.into())
    }

    pub fn pull(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Pull(field.into(), value.into())
    }

    /// Applies the update in place.
    pub fn apply(&self, doc: &mut Document) -> CollectionResult<()> {
        match self {
            Update::AddToSet(field, value) => match doc.get_mut(field) {
                None | Some(Value::Null) => {
                    doc.insert(field.clone(), Value::Array(vec![value.clone()]));
                }
                Some(Value::Array(items)) => {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
                Some(_) => return Err(not_an_array(field)),
            },
            Update::Pull(field, value) => match doc.get_mut(field) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) => items.retain(|item| item != value),
                Some(_) => return Err(not_an_array(field)),
            },
        }
        Ok(())
    }
}

fn not_an_array(field: &str) -> CollectionError {
    CollectionError::InvalidUpdate {
        field: field.to_string(),
        reason: "field is not an array".to_string(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Result shaping for `find`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    /// Field and direction; insertion order when unset.
    pub sort: Option<(String, SortOrder)>,
    pub skip: usize,
    pub limit: Option<usize>,
    /// Fields to keep; `_id` is always kept.
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sorts, pages and projects already-filtered documents.
    pub(crate) fn shape(&self, mut docs: Vec<Document>) -> Vec<Document> {
        if let Some((field, order)) = &self.sort {
            docs.sort_by(|a, b| {
                let cmp = compare_json_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                }
            });
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        docs.into_iter()
            .skip(self.skip)
            .take(limit)
            .map(|doc| match &self.projection {
                None => doc,
                Some(fields) => doc
                    .into_iter()
                    .filter(|(k, _)| k == ID_FIELD || fields.contains(k))
                    .collect(),
            })
            .collect()
    }
}

/// Compare JSON values for sorting
fn compare_json_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&b.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
