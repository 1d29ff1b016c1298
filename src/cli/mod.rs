//! CLI module for aerodb-versioned
//!
//! Provides command-line interface for:
//! - init: Create the collection log and indexes
//! - save: Store a new version read from stdin
//! - show / history: Read snapshots
//! - update-ref / archive: Move refs and gate writes

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Selector};
pub use commands::{
    archive, history, init, load_config, open, run, run_command, save, show, update_ref, JsonStore,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_payload, write_response};
