//! Version Identity Types
//!
//! The vocabulary every other module addresses snapshots with:
//! - `Version` - Immutable 128-bit snapshot identity
//! - `Ref` - Named, movable pointer to one version
//! - `VersionOrRef` - Selector naming exactly one of the two
//!
//! These are PURE TYPES. Binding refs to versions is the job of
//! `value::Values` (in memory) and `persistence` (durable).

mod id;
mod reference;
mod selector;

pub use id::{ParseVersionError, Version};
pub use reference::Ref;
pub use selector::VersionOrRef;
