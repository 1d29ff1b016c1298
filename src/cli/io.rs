//! JSON I/O handling for CLI
//!
//! - Input: one JSON object on stdin (payload for `save`)
//! - Output: one JSON object on stdout
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads the whole of stdin as one JSON object.
pub fn read_payload() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_payload(&input)
}

pub(crate) fn parse_payload(input: &str) -> CliResult<Value> {
    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }
    let value: Value = serde_json::from_str(input)?;
    if !value.is_object() {
        return Err(CliError::invalid_input("Payload must be a JSON object"));
    }
    Ok(value)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
