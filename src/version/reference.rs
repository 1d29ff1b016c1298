//! Ref - Named movable pointer
//!
//! A ref names at most one version at a time. `latest` and `public` are
//! reserved: generic ref moves refuse to touch them.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::VersionOrRef;

/// A named pointer to a version.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ref(Cow<'static, str>);

impl Ref {
    /// The head of the history. Moved forward by every save.
    pub const LATEST: Ref = Ref(Cow::Borrowed("latest"));

    /// The published snapshot.
    pub const PUBLIC: Ref = Ref(Cow::Borrowed("public"));

    /// Creates a ref with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Ref(Cow::Owned(name.into()))
    }

    /// Returns the ref name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the reserved refs.
    pub fn is_special(&self) -> bool {
        *self == Ref::LATEST || *self == Ref::PUBLIC
    }

    /// Selects the version this ref points at.
    pub fn as_version_or_ref(&self) -> VersionOrRef {
        VersionOrRef::Ref(self.clone())
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:?})", self.as_str())
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Ref {
    fn from(name: &str) -> Self {
        Ref::new(name)
    }
}

impl From<String> for Ref {
    fn from(name: String) -> Self {
        Ref::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_refs() {
        assert!(Ref::LATEST.is_special());
        assert!(Ref::PUBLIC.is_special());
        assert!(Ref::new("latest").is_special());
        assert!(!Ref::new("stable").is_special());
    }

    #[test]
    fn test_owned_and_borrowed_compare_equal() {
        assert_eq!(Ref::new("public"), Ref::PUBLIC);
        assert_eq!(Ref::from("stable").as_str(), "stable");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_value(Ref::LATEST).unwrap();
        assert_eq!(json, serde_json::json!("latest"));
        let back: Ref = serde_json::from_value(json).unwrap();
        assert_eq!(back, Ref::LATEST);
    }
}
