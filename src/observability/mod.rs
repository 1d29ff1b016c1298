//! Observability for the versioned store
//!
//! - Structured logging (JSON, one line per event)
//! - Typed lifecycle and write events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aerodb_versioned::observability::{log_event, Event};
//!
//! log_event(Event::VersionSaved, &[("id", "item-1")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a typed event with fields at the event's severity.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
