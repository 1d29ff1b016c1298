//! Documents and insertion-ordered document ids
//!
//! A document is a flat JSON object. Every stored document carries an
//! `_id` assigned at insertion: a millisecond timestamp followed by a
//! process-wide counter, rendered as 32 hex digits so string order is
//! insertion order. The timestamp never moves backwards, even when the
//! wall clock does, and ids read back from a log are observed so new
//! ones sort after them.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// A stored document.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Key holding the document id.
pub const ID_FIELD: &str = "_id";

static COUNTER: AtomicU64 = AtomicU64::new(0);
static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Insertion-monotonic document id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    millis: u64,
    counter: u64,
}

impl ObjectId {
    /// Creates an id later than every id created before it in this
    /// process.
    pub fn new() -> Self {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let millis = LAST_MILLIS.fetch_max(now, Ordering::SeqCst).max(now);
        Self {
            millis,
            counter: COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Records an id created elsewhere (a previous process) so every id
    /// created afterwards compares greater.
    pub(crate) fn observe(id: ObjectId) {
        LAST_MILLIS.fetch_max(id.millis, Ordering::SeqCst);
        COUNTER.fetch_max(id.counter.saturating_add(1), Ordering::SeqCst);
    }

    /// Returns the creation time encoded in the id.
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis as i64)
            .single()
            .unwrap_or_default()
    }

    /// Reads the id of a stored document.
    pub fn of(doc: &Document) -> Option<Self> {
        doc.get(ID_FIELD)?.as_str()?.parse().ok()
    }
}

/// Returns the document's id, assigning a fresh one if it has none.
pub(crate) fn ensure_id(doc: &mut Document) -> ObjectId {
    match ObjectId::of(doc) {
        Some(id) => id,
        None => {
            let id = ObjectId::new();
            doc.insert(ID_FIELD.to_string(), id.into());
            id
        }
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.millis, self.counter)
    }
}

impl FromStr for ObjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.is_ascii() {
            return Err(format!("Invalid object id: {}", s));
        }
        let millis = u64::from_str_radix(&s[..16], 16).map_err(|e| e.to_string())?;
        let counter = u64::from_str_radix(&s[16..], 16).map_err(|e| e.to_string())?;
        Ok(Self { millis, counter })
    }
}

impl From<ObjectId> for serde_json::Value {
    fn from(id: ObjectId) -> Self {
        serde_json::Value::String(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let ids: Vec<ObjectId> = (0..100).map(|_| ObjectId::new()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn test_observed_ids_sort_first() {
        let stored = ObjectId {
            millis: Utc::now().timestamp_millis() as u64,
            counter: COUNTER.load(Ordering::SeqCst) + 1_000,
        };
        ObjectId::observe(stored);

        let next = ObjectId::new();
        assert!(next > stored);
        assert!(next.to_string() > stored.to_string());
        assert!(ObjectId::new() > next);
    }

    #[test]
    fn test_display_parses_back() {
        let id = ObjectId::new();
        assert_eq!(id.to_string().len(), 32);
        assert_eq!(id.to_string().parse::<ObjectId>().unwrap(), id);
        assert!("xyz".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_timestamp_is_creation_time() {
        let before = Utc::now().timestamp_millis();
        let id = ObjectId::new();
        let after = Utc::now().timestamp_millis();

        let ts = id.timestamp().timestamp_millis();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_of_reads_document_id() {
        let id = ObjectId::new();
        let mut doc = Document::new();
        doc.insert(ID_FIELD.to_string(), id.into());
        assert_eq!(ObjectId::of(&doc), Some(id));
        assert_eq!(ObjectId::of(&Document::new()), None);
    }
}
