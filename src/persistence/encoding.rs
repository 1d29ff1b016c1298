//! Stored document layout
//!
//! One document per version:
//!
//! | Key       | Meaning                                       |
//! |-----------|-----------------------------------------------|
//! | `__v`     | Version, base64 of the 16 raw bytes           |
//! | `__w`     | Parent versions (omitted when absent)         |
//! | `__r`     | Refs pointing here (omitted when absent)      |
//! | `__`      | `true` only on archive marker documents       |
//! | `<id>`    | Identity the version belongs to               |
//! | `_id`     | Insertion-ordered document id                 |
//! | otherwise | Payload fields, flattened                     |
//!
//! Payloads may not use any of the reserved keys.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::errors::{StoreError, StoreResult};
use crate::collection::{Document, ObjectId, ID_FIELD};
use crate::value::Value;
use crate::version::{Ref, Version};

pub const VERSION_KEY: &str = "__v";
pub const PARENTS_KEY: &str = "__w";
pub const REFS_KEY: &str = "__r";
pub const MARKER_KEY: &str = "__";

/// Keys a payload may never contain.
pub const RESERVED_KEYS: [&str; 5] = [VERSION_KEY, PARENTS_KEY, REFS_KEY, MARKER_KEY, ID_FIELD];

/// Version metadata of one stored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "__v")]
    pub version: Version,
    #[serde(rename = "__w", default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<Version>>,
    #[serde(rename = "__r", default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<Ref>>,
}

impl Meta {
    /// Metadata of a fresh version.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            parents: None,
            refs: None,
        }
    }

    pub fn of_value<T>(value: &Value<T>) -> Self {
        Self {
            version: value.version(),
            parents: value.raw_parents().map(|p| p.iter().copied().collect()),
            refs: value.raw_refs().map(|r| r.iter().cloned().collect()),
        }
    }

    /// Reads the metadata keys of a document.
    pub fn read(doc: &Document) -> StoreResult<Self> {
        let subset: Document = [VERSION_KEY, PARENTS_KEY, REFS_KEY]
            .iter()
            .filter_map(|k| doc.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect();
        serde_json::from_value(Json::Object(subset))
            .map_err(|e| StoreError::Codec(format!("invalid version metadata: {}", e)))
    }

    /// Writes the metadata keys into a document, removing absent ones.
    pub fn write(&self, doc: &mut Document) -> StoreResult<()> {
        for key in [PARENTS_KEY, REFS_KEY] {
            doc.remove(key);
        }
        match serde_json::to_value(self)? {
            Json::Object(fields) => doc.extend(fields),
            other => return Err(StoreError::Codec(format!("metadata encoded as {}", other))),
        }
        Ok(())
    }

    pub fn holds_ref(&self, r: &Ref) -> bool {
        self.refs.as_ref().is_some_and(|refs| refs.contains(r))
    }
}

/// Converts between snapshots and stored documents for one identity key.
#[derive(Clone, Debug)]
pub struct DocumentCodec {
    id_key: String,
}

impl DocumentCodec {
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
        }
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    fn is_reserved(&self, key: &str) -> bool {
        key == self.id_key || RESERVED_KEYS.contains(&key)
    }

    /// Serializes a payload into its document fields.
    pub fn encode_payload<T: Serialize>(&self, payload: &T) -> StoreResult<Document> {
        match serde_json::to_value(payload)? {
            Json::Object(fields) => {
                if let Some(key) = fields.keys().find(|k| self.is_reserved(k)) {
                    return Err(StoreError::Codec(format!(
                        "payload uses reserved key '{}'",
                        key
                    )));
                }
                Ok(fields)
            }
            other => Err(StoreError::Codec(format!(
                "payload must serialize to an object, got {}",
                other
            ))),
        }
    }

    /// Builds the stored document of a new version.
    pub fn encode<T: Serialize>(&self, id: &str, payload: &T, meta: &Meta) -> StoreResult<Document> {
        let mut doc = self.encode_payload(payload)?;
        doc.insert(self.id_key.clone(), Json::String(id.to_string()));
        meta.write(&mut doc)?;
        Ok(doc)
    }

    /// Builds the stored document of an existing snapshot.
    pub fn encode_value<T: Serialize>(&self, id: &str, value: &Value<T>) -> StoreResult<Document> {
        self.encode(id, value.payload(), &Meta::of_value(value))
    }

    /// Rebuilds the snapshot stored in a document. The timestamp is the
    /// creation time of the document's `_id`.
    pub fn decode<T: DeserializeOwned>(&self, mut doc: Document) -> StoreResult<Value<T>> {
        let meta = Meta::read(&doc)?;
        let timestamp = ObjectId::of(&doc)
            .map(|id| id.timestamp())
            .unwrap_or_default();

        doc.retain(|k, _| !self.is_reserved(k));
        let payload: T = serde_json::from_value(Json::Object(doc))?;

        let parents = meta.parents.map(BTreeSet::from_iter);
        let refs = meta.refs.map(BTreeSet::from_iter);
        Value::from_parts(meta.version, parents, refs, timestamp, payload)
            .ok_or_else(|| StoreError::Codec(format!("invalid stored version {}", meta.version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Article {
        title: String,
        words: u32,
    }

    fn article() -> Article {
        Article {
            title: "Hello".to_string(),
            words: 3,
        }
    }

    fn codec() -> DocumentCodec {
        DocumentCodec::new("id")
    }

    #[test]
    fn test_encode_layout() {
        let parent = Version::new();
        let value = Value::new(Version::new(), [parent], [Ref::LATEST], Utc::now(), article())
            .unwrap();
        let doc = codec().encode_value("a1", &value).unwrap();

        assert_eq!(doc["id"], json!("a1"));
        assert_eq!(doc["title"], json!("Hello"));
        assert_eq!(doc[VERSION_KEY], json!(value.version().to_base64()));
        assert_eq!(doc[PARENTS_KEY], json!([parent.to_base64()]));
        assert_eq!(doc[REFS_KEY], json!(["latest"]));
        assert!(!doc.contains_key(MARKER_KEY));
    }

    #[test]
    fn test_absent_sets_are_omitted() {
        let value = Value::new(Version::new(), [], [], Utc::now(), article()).unwrap();
        let doc = codec().encode_value("a1", &value).unwrap();
        assert!(!doc.contains_key(PARENTS_KEY));
        assert!(!doc.contains_key(REFS_KEY));
    }

    #[test]
    fn test_metadata_round_trip() {
        let stored = json!({
            "id": "a1",
            "title": "Hello",
            "words": 3,
            "__v": Version::new().to_base64(),
            "__w": [Version::new().to_base64()],
            "__r": [],
        });
        let doc = stored.as_object().cloned().unwrap();

        let value: Value<Article> = codec().decode(doc.clone()).unwrap();
        assert!(value.refs().is_empty());
        let encoded = codec().encode_value("a1", &value).unwrap();
        assert_eq!(encoded, doc);
    }

    #[test]
    fn test_decode_uses_document_timestamp() {
        let id = ObjectId::new();
        let mut doc = codec()
            .encode("a1", &article(), &Meta::new(Version::new()))
            .unwrap();
        doc.insert(ID_FIELD.to_string(), id.into());

        let value: Value<Article> = codec().decode(doc).unwrap();
        assert_eq!(value.timestamp(), id.timestamp());
        assert_eq!(value.payload(), &article());
    }

    #[test]
    fn test_reserved_payload_keys_rejected() {
        for key in ["__v", "__", "_id", "id"] {
            let mut payload = Document::new();
            payload.insert(key.to_string(), json!(1));
            let err = codec().encode_payload(&payload).unwrap_err();
            assert!(matches!(err, StoreError::Codec(_)), "{}", key);
        }
        assert!(codec().encode_payload(&json!("scalar")).is_err());
    }

    #[test]
    fn test_decode_rejects_self_parent() {
        let v = Version::new();
        let doc = json!({"__v": v.to_base64(), "__w": [v.to_base64()], "title": "x", "words": 1});
        let result: StoreResult<Value<Article>> = codec().decode(doc.as_object().cloned().unwrap());
        assert!(matches!(result, Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_missing_version() {
        let doc = json!({"title": "x", "words": 1});
        let result: StoreResult<Value<Article>> = codec().decode(doc.as_object().cloned().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_meta_write_clears_absent_sets() {
        let mut doc = json!({"__w": [], "__r": ["latest"]}).as_object().cloned().unwrap();
        Meta::new(Version::new()).write(&mut doc).unwrap();
        assert!(!doc.contains_key(PARENTS_KEY));
        assert!(!doc.contains_key(REFS_KEY));
        assert!(doc.contains_key(VERSION_KEY));
    }
}
