//! Versioned Value Model
//!
//! In-memory half of the store:
//! - `Value` - One immutable snapshot with its parents and refs
//! - `Values` - The version DAG of one identity, plus archive state
//! - `Query` - Selector used to filter a `Values` or build storage filters
//!
//! Invariants enforced here:
//! - No version is its own parent
//! - Versions are unique within a `Values`
//! - A ref is held by at most one version at a time
//! - Every parent edge points at a version in the same `Values`
//!
//! `Values` holds no internal synchronization. Concurrent owners must
//! wrap it in their own lock or single-writer discipline.

mod query;
#[allow(clippy::module_inception)]
mod value;
mod values;

pub use query::Query;
pub use value::Value;
pub use values::Values;
