//! Values - Version DAG of one identity
//!
//! Holds every snapshot of one logical object in insertion order, plus
//! the archive flag. Mutation goes through two operations only:
//! - `add` appends a snapshot derived from a parent and moves the parent
//!   ref forward onto it
//! - `update_ref` rebinds a named ref
//!
//! Archived collections accept neither. Reserved refs cannot be moved by
//! `update_ref` and only `latest` may be branched from by `add`.
//!
//! Every read returns clones so callers never hold the live sets.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;

use super::Value;
use crate::version::{Ref, Version, VersionOrRef};

/// The full version history of one identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Values<T> {
    inner: Vec<Value<T>>,
    archived: bool,
}

impl<T> Default for Values<T> {
    fn default() -> Self {
        Self {
            inner: Vec::new(),
            archived: false,
        }
    }
}

impl<T: Clone> Values<T> {
    /// Creates an empty, unarchived history.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a history from an externally supplied list.
    ///
    /// Returns `None` if the list breaks any DAG invariant.
    pub fn new(inner: Vec<Value<T>>, archived: bool) -> Option<Self> {
        let values = Self { inner, archived };
        values.validate().then_some(values)
    }

    fn position(&self, vr: &VersionOrRef) -> Option<usize> {
        match vr {
            VersionOrRef::Version(v) => self.inner.iter().position(|x| x.version() == *v),
            VersionOrRef::Ref(r) => self.inner.iter().position(|x| x.holds_ref(r)),
        }
    }

    /// Returns a copy of the snapshot selected by `vr`.
    pub fn get(&self, vr: &VersionOrRef) -> Option<Value<T>> {
        self.position(vr).map(|i| self.inner[i].clone())
    }

    /// Returns a copy of the snapshot `latest` points at.
    pub fn latest(&self) -> Option<Value<T>> {
        self.get(&VersionOrRef::latest())
    }

    pub fn latest_version(&self) -> Option<Version> {
        self.position(&VersionOrRef::latest())
            .map(|i| self.inner[i].version())
    }

    /// Returns copies of every snapshot in insertion order.
    pub fn all(&self) -> Vec<Value<T>> {
        self.inner.clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn is_archived(&self) -> bool {
        self.archived
    }

    pub fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
    }

    /// Appends a snapshot of `payload` derived from `parent` (default
    /// `latest`; an empty selector counts as omitted).
    ///
    /// When the parent is selected through a ref, that ref moves onto the
    /// new snapshot. An empty history bootstraps with a parentless
    /// snapshot holding `latest`.
    ///
    /// Returns the new version, or `None` when nothing was appended:
    /// archived, a reserved parent ref other than `latest`, or a parent
    /// that does not resolve in a non-empty history.
    pub fn add(&mut self, payload: T, parent: Option<VersionOrRef>) -> Option<Version> {
        if self.archived {
            return None;
        }
        let parent = match parent {
            Some(vr) if !vr.is_empty() => vr,
            _ => VersionOrRef::latest(),
        };
        if parent.is_special_ref() && !parent.is_ref(&Ref::LATEST) {
            return None;
        }

        let version = Version::new();
        let value = match self.position(&parent) {
            Some(i) => {
                let moved: Vec<Ref> = parent.reference().cloned().into_iter().collect();
                self.inner[i].delete_refs(&moved);
                Value::new(
                    version,
                    [self.inner[i].version()],
                    moved,
                    Utc::now(),
                    payload,
                )
            }
            None if self.inner.is_empty() => {
                Value::new(version, [], [Ref::LATEST], Utc::now(), payload)
            }
            None => return None,
        }?;

        self.inner.push(value);
        Some(version)
    }

    /// Rebinds `r` to the snapshot selected by `dest`, or unbinds it when
    /// `dest` is `None`.
    ///
    /// Returns false without changing anything if the history is archived
    /// or `r` is reserved. If `dest` does not resolve the ref ends up
    /// unbound.
    pub fn update_ref(&mut self, r: Ref, dest: Option<VersionOrRef>) -> bool {
        if self.archived || r.is_special() {
            return false;
        }

        let current = VersionOrRef::Ref(r.clone());
        if let Some(i) = self.position(&current) {
            self.inner[i].delete_refs([&r]);
        }

        if let Some(i) = dest.as_ref().and_then(|d| self.position(d)) {
            self.inner[i].add_refs([r]);
        }
        true
    }

    /// Walks parent edges from the snapshot selected by `vr`, newest
    /// first, visiting each version once.
    pub fn history(&self, vr: &VersionOrRef) -> Vec<Value<T>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<usize> = self.position(vr).into_iter().collect();

        while let Some(i) = stack.pop() {
            let value = &self.inner[i];
            if !seen.insert(value.version()) {
                continue;
            }
            // Later insertions are newer; push older parents first so the
            // newest is popped next.
            let mut parents: Vec<usize> = value
                .parents()
                .iter()
                .filter_map(|p| self.position(&VersionOrRef::Version(*p)))
                .collect();
            parents.sort_unstable();
            stack.extend(parents);
            out.push(value.clone());
        }
        out
    }

    /// Checks the DAG invariants over the whole history.
    pub fn validate(&self) -> bool {
        let mut versions = HashSet::with_capacity(self.inner.len());
        let mut refs = BTreeSet::new();

        for value in &self.inner {
            if value.has_parent(&value.version()) {
                return false;
            }
            if !versions.insert(value.version()) {
                return false;
            }
            for r in value.raw_refs().into_iter().flatten() {
                if !refs.insert(r.clone()) {
                    return false;
                }
            }
        }

        self.inner
            .iter()
            .flat_map(|value| value.raw_parents().into_iter().flatten())
            .all(|p| versions.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable() -> Ref {
        Ref::new("stable")
    }

    #[test]
    fn test_first_add_bootstraps_latest() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();

        let all = values.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].version(), v1);
        assert!(all[0].parents().is_empty());
        assert_eq!(all[0].refs(), BTreeSet::from([Ref::LATEST]));
    }

    #[test]
    fn test_add_moves_latest_forward() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        let v2 = values.add("v2", Some(VersionOrRef::latest())).unwrap();

        let first = values.get(&v1.as_version_or_ref()).unwrap();
        let second = values.get(&v2.as_version_or_ref()).unwrap();
        assert!(first.refs().is_empty());
        assert_eq!(second.parents(), BTreeSet::from([v1]));
        assert_eq!(second.refs(), BTreeSet::from([Ref::LATEST]));
        assert_eq!(values.latest_version(), Some(v2));
    }

    #[test]
    fn test_empty_parent_selector_means_latest() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        let v2 = values.add("v2", Some(Version::ZERO.as_version_or_ref())).unwrap();
        let v3 = values.add("v3", Some(Ref::new("").as_version_or_ref())).unwrap();

        let second = values.get(&v2.as_version_or_ref()).unwrap();
        let third = values.get(&v3.as_version_or_ref()).unwrap();
        assert_eq!(second.parents(), BTreeSet::from([v1]));
        assert_eq!(third.parents(), BTreeSet::from([v2]));
        assert_eq!(values.latest_version(), Some(v3));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_add_from_version_leaves_refs_in_place() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        let v2 = values.add("v2", None).unwrap();
        let branch = values.add("b", Some(v1.as_version_or_ref())).unwrap();

        let branch = values.get(&branch.as_version_or_ref()).unwrap();
        assert_eq!(branch.parents(), BTreeSet::from([v1]));
        assert!(branch.refs().is_empty());
        assert_eq!(values.latest_version(), Some(v2));
    }

    #[test]
    fn test_add_from_named_ref_moves_that_ref() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        values.update_ref(stable(), Some(v1.as_version_or_ref()));

        let v2 = values.add("v2", Some(stable().as_version_or_ref())).unwrap();

        assert!(!values.get(&v1.as_version_or_ref()).unwrap().holds_ref(&stable()));
        let second = values.get(&stable().as_version_or_ref()).unwrap();
        assert_eq!(second.version(), v2);
        assert!(!second.holds_ref(&Ref::LATEST));
        assert_eq!(values.latest_version(), Some(v1));
    }

    #[test]
    fn test_add_from_public_is_rejected() {
        let mut values = Values::empty();
        values.add("v1", None);
        assert!(values.add("x", Some(Ref::PUBLIC.as_version_or_ref())).is_none());
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_add_with_missing_parent_is_noop() {
        let mut values = Values::empty();
        values.add("v1", None);
        assert!(values.add("x", Some(Version::new().as_version_or_ref())).is_none());
        assert!(values.add("x", Some(Ref::new("nope").as_version_or_ref())).is_none());
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_add_on_empty_ignores_missing_parent() {
        let mut values = Values::empty();
        let v = values.add("v1", Some(Ref::new("draft").as_version_or_ref()));
        assert!(v.is_some());
        assert_eq!(values.latest_version(), v);
    }

    #[test]
    fn test_update_ref_moves_pointer() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        let v2 = values.add("v2", None).unwrap();

        assert!(values.update_ref(stable(), Some(v1.as_version_or_ref())));
        assert_eq!(
            values.get(&v1.as_version_or_ref()).unwrap().refs(),
            BTreeSet::from([stable()])
        );

        assert!(values.update_ref(stable(), Some(v2.as_version_or_ref())));
        assert!(values.get(&v1.as_version_or_ref()).unwrap().refs().is_empty());
        assert_eq!(
            values.get(&v2.as_version_or_ref()).unwrap().refs(),
            BTreeSet::from([Ref::LATEST, stable()])
        );
    }

    #[test]
    fn test_update_ref_unbinds_without_dest() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        values.update_ref(stable(), Some(v1.as_version_or_ref()));
        values.update_ref(stable(), None);
        assert!(values.get(&stable().as_version_or_ref()).is_none());
    }

    #[test]
    fn test_update_ref_rejects_special_refs() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        values.add("v2", None);

        assert!(!values.update_ref(Ref::LATEST, Some(v1.as_version_or_ref())));
        assert!(!values.update_ref(Ref::PUBLIC, Some(v1.as_version_or_ref())));
        assert_ne!(values.latest_version(), Some(v1));
        assert!(values.get(&Ref::PUBLIC.as_version_or_ref()).is_none());
    }

    #[test]
    fn test_archived_rejects_mutation() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        values.set_archived(true);
        values.set_archived(true);

        assert!(values.add("v2", None).is_none());
        assert!(!values.update_ref(stable(), Some(v1.as_version_or_ref())));
        assert_eq!(values.len(), 1);

        values.set_archived(false);
        assert!(values.add("v2", None).is_some());
    }

    #[test]
    fn test_get_returns_copy() {
        let mut values = Values::empty();
        values.add("v1", None);

        let mut latest = values.latest().unwrap();
        latest.delete_refs(&[Ref::LATEST]);
        assert!(values.latest().is_some());
    }

    #[test]
    fn test_new_rejects_shared_refs() {
        let a = Value::new(Version::new(), [], [Ref::LATEST], Utc::now(), 1).unwrap();
        let b = Value::new(Version::new(), [], [Ref::LATEST], Utc::now(), 2).unwrap();
        assert!(Values::new(vec![a, b], false).is_none());
    }

    #[test]
    fn test_new_rejects_duplicate_versions() {
        let a = Value::new(Version::new(), [], [], Utc::now(), 1).unwrap();
        assert!(Values::new(vec![a.clone(), a], false).is_none());
    }

    #[test]
    fn test_new_rejects_dangling_parent() {
        let a = Value::new(Version::new(), [Version::new()], [], Utc::now(), 1).unwrap();
        assert!(Values::new(vec![a], false).is_none());
    }

    #[test]
    fn test_new_accepts_valid_dag() {
        let root = Value::new(Version::new(), [], [], Utc::now(), 1).unwrap();
        let head = Value::new(Version::new(), [root.version()], [Ref::LATEST], Utc::now(), 2)
            .unwrap();
        let values = Values::new(vec![root, head.clone()], true).unwrap();
        assert!(values.is_archived());
        assert_eq!(values.latest_version(), Some(head.version()));
    }

    #[test]
    fn test_history_follows_parents() {
        let mut values = Values::empty();
        let v1 = values.add("v1", None).unwrap();
        let v2 = values.add("v2", None).unwrap();
        let v3 = values.add("v3", None).unwrap();
        values.add("side", Some(v1.as_version_or_ref()));

        let history: Vec<Version> = values
            .history(&VersionOrRef::latest())
            .iter()
            .map(Value::version)
            .collect();
        assert_eq!(history, vec![v3, v2, v1]);
        assert!(values.history(&Ref::new("nope").as_version_or_ref()).is_empty());
    }
}
