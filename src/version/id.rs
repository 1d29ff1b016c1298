//! Version - Immutable snapshot identity
//!
//! A version is a random 128-bit value. It is never reused and never
//! changes after creation. The nil value is reserved as the "no version"
//! sentinel.
//!
//! On the wire a version is its 16 raw bytes, carried as a standard
//! base64 string because JSON documents have no binary type.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use super::VersionOrRef;

/// Error returned when a version cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid version: {0}")]
pub struct ParseVersionError(String);

/// Identity of one immutable snapshot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(Uuid);

impl Version {
    /// The "no version" sentinel.
    pub const ZERO: Version = Version(Uuid::nil());

    /// Creates a fresh, globally unique version.
    pub fn new() -> Self {
        Version(Uuid::new_v4())
    }

    /// Wraps raw bytes as a version.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Version(Uuid::from_bytes(bytes))
    }

    /// Returns the raw 16 bytes.
    #[inline]
    pub fn as_bytes(&self) -> [u8; 16] {
        *self.0.as_bytes()
    }

    /// Returns true for the sentinel.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }

    /// Selects this exact version.
    pub fn as_version_or_ref(&self) -> VersionOrRef {
        VersionOrRef::Version(*self)
    }

    /// Decodes the base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, ParseVersionError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| ParseVersionError(format!("{}: {}", encoded, e)))?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ParseVersionError(format!("expected 16 bytes, got {}", b.len())))?;
        Ok(Version::from_bytes(bytes))
    }

    /// Encodes the version in its base64 wire form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_bytes())
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::ZERO
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Version)
            .map_err(|e| ParseVersionError(format!("{}: {}", s, e)))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

struct VersionVisitor;

impl<'de> Visitor<'de> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a base64 encoded 16-byte version")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Version, E> {
        Version::from_base64(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(VersionVisitor)
    }
}
