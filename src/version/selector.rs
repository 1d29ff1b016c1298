//! VersionOrRef - Snapshot selector
//!
//! Everywhere a caller says "the version pointed to by X", X is one of
//! these. The two cases are an enum so every consumer matches
//! exhaustively; "neither" is `Option::None` at the call site.

use std::fmt;

use super::{Ref, Version};

/// Selects a snapshot either directly or through a ref.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum VersionOrRef {
    /// An exact version.
    Version(Version),
    /// Whatever version the ref currently points at.
    Ref(Ref),
}

impl VersionOrRef {
    /// Selector for the `latest` ref.
    pub fn latest() -> Self {
        VersionOrRef::Ref(Ref::LATEST)
    }

    /// True when the selector cannot select anything: the zero version
    /// or an unnamed ref.
    pub fn is_empty(&self) -> bool {
        match self {
            VersionOrRef::Version(v) => v.is_zero(),
            VersionOrRef::Ref(r) => r.as_str().is_empty(),
        }
    }

    /// Returns the version when this selects one directly.
    pub fn as_version(&self) -> Option<Version> {
        match self {
            VersionOrRef::Version(v) => Some(*v),
            VersionOrRef::Ref(_) => None,
        }
    }

    /// Returns the ref when this selects through one.
    pub fn reference(&self) -> Option<&Ref> {
        match self {
            VersionOrRef::Version(_) => None,
            VersionOrRef::Ref(r) => Some(r),
        }
    }

    /// True if this selects through exactly `r`.
    pub fn is_ref(&self, r: &Ref) -> bool {
        self.reference() == Some(r)
    }

    /// True if this selects through a reserved ref.
    pub fn is_special_ref(&self) -> bool {
        self.reference().map(Ref::is_special).unwrap_or(false)
    }
}

impl From<Version> for VersionOrRef {
    fn from(v: Version) -> Self {
        VersionOrRef::Version(v)
    }
}

impl From<Ref> for VersionOrRef {
    fn from(r: Ref) -> Self {
        VersionOrRef::Ref(r)
    }
}

impl fmt::Debug for VersionOrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionOrRef::Version(v) => write!(f, "{:?}", v),
            VersionOrRef::Ref(r) => write!(f, "{:?}", r),
        }
    }
}

impl fmt::Display for VersionOrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionOrRef::Version(v) => write!(f, "version {}", v),
            VersionOrRef::Ref(r) => write!(f, "ref {}", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_case() {
        let v = Version::new();
        let by_version = v.as_version_or_ref();
        assert_eq!(by_version.as_version(), Some(v));
        assert!(by_version.reference().is_none());

        let by_ref = Ref::new("stable").as_version_or_ref();
        assert!(by_ref.as_version().is_none());
        assert_eq!(by_ref.reference(), Some(&Ref::new("stable")));
    }

    #[test]
    fn test_is_ref_and_special() {
        assert!(VersionOrRef::latest().is_ref(&Ref::LATEST));
        assert!(VersionOrRef::latest().is_special_ref());
        assert!(Ref::PUBLIC.as_version_or_ref().is_special_ref());
        assert!(!Ref::new("draft").as_version_or_ref().is_special_ref());
        assert!(!Version::new().as_version_or_ref().is_special_ref());
        assert!(!Version::new().as_version_or_ref().is_ref(&Ref::LATEST));
    }

    #[test]
    fn test_empty_selectors() {
        assert!(Version::ZERO.as_version_or_ref().is_empty());
        assert!(Ref::new("").as_version_or_ref().is_empty());
        assert!(!VersionOrRef::latest().is_empty());
    }
}
