//! Query - Snapshot selector over a history
//!
//! Either every snapshot or the one pinned by a `VersionOrRef`. The
//! persistence layer turns a query into a storage filter; in memory it
//! filters a `Values` directly.

use super::{Value, Values};
use crate::version::{Ref, VersionOrRef};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Query {
    /// Every snapshot.
    #[default]
    All,
    /// The snapshot selected by a version or ref.
    Eq(VersionOrRef),
}

impl Query {
    /// The snapshot `latest` points at.
    pub fn latest() -> Self {
        Query::Eq(VersionOrRef::latest())
    }

    /// The snapshot `r` points at.
    pub fn by_ref(r: Ref) -> Self {
        Query::Eq(VersionOrRef::Ref(r))
    }

    /// True if `value` is selected by this query.
    pub fn matches<T>(&self, value: &Value<T>) -> bool {
        match self {
            Query::All => true,
            Query::Eq(VersionOrRef::Version(v)) => value.version() == *v,
            Query::Eq(VersionOrRef::Ref(r)) => value.holds_ref(r),
        }
    }

    /// Returns copies of the selected snapshots in insertion order.
    pub fn select<T: Clone>(&self, values: &Values<T>) -> Vec<Value<T>> {
        match self {
            Query::All => values.all(),
            Query::Eq(vr) => values.get(vr).into_iter().collect(),
        }
    }
}

impl From<VersionOrRef> for Query {
    fn from(vr: VersionOrRef) -> Self {
        Query::Eq(vr)
    }
}
