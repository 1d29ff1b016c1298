//! Value - One immutable snapshot
//!
//! A value pairs a payload with its version, the versions it was derived
//! from, and the refs currently pointing at it. The version, parents,
//! timestamp and payload never change after construction; only the ref
//! set moves, and only through the owning `Values`.
//!
//! Parent and ref sets distinguish "absent" from "present but empty".
//! The storage encoding omits absent sets and keeps empty ones, so the
//! distinction must survive a decode/encode cycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::version::{Ref, Version};

/// A single immutable snapshot of a payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Value<T> {
    version: Version,
    parents: Option<BTreeSet<Version>>,
    refs: Option<BTreeSet<Ref>>,
    timestamp: DateTime<Utc>,
    payload: T,
}

impl<T> Value<T> {
    /// Creates a snapshot.
    ///
    /// Returns `None` if `version` is the zero sentinel or appears in its
    /// own parent set. Empty parent or ref inputs are stored as absent.
    pub fn new(
        version: Version,
        parents: impl IntoIterator<Item = Version>,
        refs: impl IntoIterator<Item = Ref>,
        timestamp: DateTime<Utc>,
        payload: T,
    ) -> Option<Self> {
        let parents: BTreeSet<Version> = parents.into_iter().collect();
        let refs: BTreeSet<Ref> = refs.into_iter().collect();
        Self::from_parts(
            version,
            (!parents.is_empty()).then_some(parents),
            (!refs.is_empty()).then_some(refs),
            timestamp,
            payload,
        )
    }

    /// Creates a snapshot keeping the absent/empty distinction exactly as
    /// given. Used when decoding stored documents.
    pub fn from_parts(
        version: Version,
        parents: Option<BTreeSet<Version>>,
        refs: Option<BTreeSet<Ref>>,
        timestamp: DateTime<Utc>,
        payload: T,
    ) -> Option<Self> {
        if version.is_zero() {
            return None;
        }
        if parents.as_ref().is_some_and(|p| p.contains(&version)) {
            return None;
        }
        Some(Self {
            version,
            parents,
            refs,
            timestamp,
            payload,
        })
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns a copy of the parent set.
    pub fn parents(&self) -> BTreeSet<Version> {
        self.parents.clone().unwrap_or_default()
    }

    /// Returns a copy of the ref set.
    pub fn refs(&self) -> BTreeSet<Ref> {
        self.refs.clone().unwrap_or_default()
    }

    /// True if `v` is a direct parent of this snapshot.
    pub fn has_parent(&self, v: &Version) -> bool {
        self.parents.as_ref().is_some_and(|p| p.contains(v))
    }

    /// True if `r` currently points at this snapshot.
    pub fn holds_ref(&self, r: &Ref) -> bool {
        self.refs.as_ref().is_some_and(|s| s.contains(r))
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Points the given refs at this snapshot.
    pub fn add_refs(&mut self, refs: impl IntoIterator<Item = Ref>) {
        let mut refs = refs.into_iter().peekable();
        if refs.peek().is_none() {
            return;
        }
        self.refs.get_or_insert_with(BTreeSet::new).extend(refs);
    }

    /// Unpoints the given refs. Removing the last ref leaves the set
    /// absent rather than empty.
    pub fn delete_refs<'a>(&mut self, refs: impl IntoIterator<Item = &'a Ref>) {
        if let Some(set) = self.refs.as_mut() {
            for r in refs {
                set.remove(r);
            }
            if set.is_empty() {
                self.refs = None;
            }
        }
    }

    pub(crate) fn raw_parents(&self) -> Option<&BTreeSet<Version>> {
        self.parents.as_ref()
    }

    pub(crate) fn raw_refs(&self) -> Option<&BTreeSet<Ref>> {
        self.refs.as_ref()
    }
}
