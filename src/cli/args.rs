//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodb-versioned init
//! - aerodb-versioned save --id <id> [--parent-version <v> | --parent-ref <r>]
//! - aerodb-versioned show --id <id> [--version <v> | --ref <r>]
//! - aerodb-versioned history --id <id> [--version <v> | --ref <r>]
//! - aerodb-versioned update-ref --id <id> --name <r> [--to-version <v> | --to-ref <r>]
//! - aerodb-versioned archive --id <id> [--off]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::version::{Ref, Version, VersionOrRef};

/// Versioned value store over a durable document log
#[derive(Parser, Debug)]
#[command(name = "aerodb-versioned")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./aerodb-versioned.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Picks one snapshot; `latest` when both flags are omitted.
#[derive(Args, Debug, Clone, Default)]
pub struct Selector {
    /// Version id
    #[arg(long, conflicts_with = "reference")]
    pub version: Option<Version>,

    /// Ref name
    #[arg(long = "ref")]
    pub reference: Option<String>,
}

impl Selector {
    pub fn to_version_or_ref(&self) -> VersionOrRef {
        select(self.version, self.reference.as_deref()).unwrap_or_else(VersionOrRef::latest)
    }
}

pub(crate) fn select(version: Option<Version>, reference: Option<&str>) -> Option<VersionOrRef> {
    match (version, reference) {
        (Some(v), _) => Some(VersionOrRef::Version(v)),
        (None, Some(r)) => Some(VersionOrRef::Ref(Ref::new(r))),
        (None, None) => None,
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory, collection log and indexes
    Init,

    /// Save the JSON object on stdin as a new version
    Save {
        /// Identity the version belongs to
        #[arg(long)]
        id: String,

        /// Branch from this version
        #[arg(long, conflicts_with = "parent_ref")]
        parent_version: Option<Version>,

        /// Branch from the version this ref points at, moving the ref
        #[arg(long)]
        parent_ref: Option<String>,
    },

    /// Print one snapshot
    Show {
        #[arg(long)]
        id: String,

        #[command(flatten)]
        at: Selector,
    },

    /// Print the ancestry of a snapshot, newest first
    History {
        #[arg(long)]
        id: String,

        #[command(flatten)]
        from: Selector,
    },

    /// Point a ref at a snapshot, or unbind it when no target is given
    UpdateRef {
        #[arg(long)]
        id: String,

        /// Ref to move
        #[arg(long)]
        name: String,

        #[arg(long, conflicts_with = "to_ref")]
        to_version: Option<Version>,

        #[arg(long)]
        to_ref: Option<String>,
    },

    /// Archive an identity, or unarchive it with --off
    Archive {
        #[arg(long)]
        id: String,

        #[arg(long)]
        off: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
