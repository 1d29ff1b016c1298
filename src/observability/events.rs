//! Observable events of the versioned store
//!
//! Events are explicit and typed. The string form is the `event` key of
//! the emitted log line.

use std::fmt;

use super::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Collection log
    /// Operation log replayed into memory
    CollectionReplayed,
    /// Torn trailing record cut off the operation log
    CollectionTailTruncated,
    /// Record append failed and its mutation was taken back
    CollectionAppendFailed,
    /// Index set declared on a versioned collection
    IndexesEnsured,

    // Versioned store writes
    /// New version document written
    VersionSaved,
    /// Ref pulled from one version and pushed onto another
    RefMoved,
    /// Archive marker set or cleared
    ArchiveSet,
    /// Write refused because the identity is archived
    WriteRejectedArchived,
    /// Documents removed by filter
    Removed,
    /// Whole collection emptied
    Emptied,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CollectionReplayed => "COLLECTION_REPLAYED",
            Event::CollectionTailTruncated => "COLLECTION_TAIL_TRUNCATED",
            Event::CollectionAppendFailed => "COLLECTION_APPEND_FAILED",
            Event::IndexesEnsured => "VSTORE_INDEXES_ENSURED",
            Event::VersionSaved => "VSTORE_VERSION_SAVED",
            Event::RefMoved => "VSTORE_REF_MOVED",
            Event::ArchiveSet => "VSTORE_ARCHIVE_SET",
            Event::WriteRejectedArchived => "VSTORE_WRITE_REJECTED_ARCHIVED",
            Event::Removed => "VSTORE_REMOVED",
            Event::Emptied => "VSTORE_EMPTIED",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::CollectionAppendFailed => Severity::Error,
            Event::CollectionTailTruncated | Event::WriteRejectedArchived => Severity::Warn,
            Event::IndexesEnsured | Event::RefMoved | Event::VersionSaved => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_unique() {
        let events = [
            Event::ConfigLoaded,
            Event::CollectionReplayed,
            Event::CollectionTailTruncated,
            Event::CollectionAppendFailed,
            Event::IndexesEnsured,
            Event::VersionSaved,
            Event::RefMoved,
            Event::ArchiveSet,
            Event::WriteRejectedArchived,
            Event::Removed,
            Event::Emptied,
        ];
        let names: std::collections::HashSet<_> = events.iter().map(Event::as_str).collect();
        assert_eq!(names.len(), events.len());
    }

    #[test]
    fn test_truncation_is_a_warning() {
        assert_eq!(Event::CollectionTailTruncated.severity(), Severity::Warn);
        assert_eq!(Event::ArchiveSet.severity(), Severity::Info);
        assert_eq!(Event::CollectionAppendFailed.severity(), Severity::Error);
    }
}
