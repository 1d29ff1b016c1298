//! aerodb-versioned - Versioned values over a document store
//!
//! Each identity owns a DAG of immutable snapshots. Named refs point at
//! snapshots; `latest` follows new saves and `public` marks the published
//! one. Histories are kept in memory (`value::Values`) or persisted one
//! document per version (`persistence::VersionedCollection`).

pub mod cli;
pub mod collection;
pub mod config;
pub mod observability;
pub mod persistence;
pub mod value;
pub mod version;
