//! Collection log record format
//!
//! Every mutation of a durable collection is one record:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE)
//! +------------------+
//! | Header Checksum  | (u32 LE)
//! +------------------+
//! | Operation        | (JSON bytes)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Record length counts all four parts and never exceeds
//! `MAX_RECORD_SIZE`. The header checksum covers the length alone, so a
//! damaged length is told apart from a record cut off mid-write. The
//! trailing CRC32 checksum covers everything before it.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::errors::{CollectionError, CollectionResult};
use super::filter::{Filter, Update};
use super::index::IndexModel;

const LENGTH_SIZE: usize = 4;
const HEADER_SIZE: usize = LENGTH_SIZE + 4;
const CHECKSUM_SIZE: usize = 4;

/// Largest record the log accepts.
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// One logged mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LogOp {
    /// Document as stored, `_id` included.
    Insert { document: Document },
    UpdateOne { filter: Filter, update: Update },
    UpdateMany { filter: Filter, update: Update },
    /// Replacement carries its `_id` so an upsert replays identically.
    Replace {
        filter: Filter,
        document: Document,
        upsert: bool,
    },
    Delete { filter: Filter },
    Drop,
    CreateIndex { index: IndexModel },
}

/// Outcome of decoding at one offset.
#[derive(Debug)]
pub enum Decoded {
    /// A complete record and its total size.
    Record(LogOp, usize),
    /// The remaining bytes are too short to hold the record their intact
    /// header announces; a write was cut off.
    Torn,
}

impl LogOp {
    /// The document an insert or replacement writes.
    pub fn document(&self) -> Option<&Document> {
        match self {
            LogOp::Insert { document } | LogOp::Replace { document, .. } => Some(document),
            _ => None,
        }
    }

    pub(crate) fn document_mut(&mut self) -> Option<&mut Document> {
        match self {
            LogOp::Insert { document } | LogOp::Replace { document, .. } => Some(document),
            _ => None,
        }
    }

    /// Serializes the operation as a framed record.
    pub fn encode(&self) -> CollectionResult<Vec<u8>> {
        let body = serde_json::to_vec(self)?;
        let record_length = HEADER_SIZE + body.len() + CHECKSUM_SIZE;
        if record_length > MAX_RECORD_SIZE {
            return Err(CollectionError::Internal(format!(
                "record of {} bytes exceeds limit {}",
                record_length, MAX_RECORD_SIZE
            )));
        }

        let length_bytes = (record_length as u32).to_le_bytes();
        let mut record = Vec::with_capacity(record_length);
        record.extend_from_slice(&length_bytes);
        record.extend_from_slice(&compute_checksum(&length_bytes).to_le_bytes());
        record.extend_from_slice(&body);
        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());
        Ok(record)
    }

    /// Decodes the record at the start of `data`.
    ///
    /// `offset` is only used in error messages.
    pub fn decode(data: &[u8], offset: u64) -> CollectionResult<Decoded> {
        if data.len() < HEADER_SIZE {
            return Ok(Decoded::Torn);
        }
        let corruption = |reason: String| CollectionError::Corruption { offset, reason };

        let length_bytes = [data[0], data[1], data[2], data[3]];
        let header_checksum = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if compute_checksum(&length_bytes) != header_checksum {
            return Err(corruption("header checksum mismatch".to_string()));
        }

        let record_length = u32::from_le_bytes(length_bytes) as usize;
        if record_length < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(corruption(format!(
                "record length {} below minimum",
                record_length
            )));
        }
        if record_length > MAX_RECORD_SIZE {
            return Err(corruption(format!(
                "record length {} exceeds limit {}",
                record_length, MAX_RECORD_SIZE
            )));
        }
        if data.len() < record_length {
            return Ok(Decoded::Torn);
        }

        let checked = &data[..record_length - CHECKSUM_SIZE];
        let stored = &data[record_length - CHECKSUM_SIZE..record_length];
        let expected = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if compute_checksum(checked) != expected {
            return Err(corruption("checksum mismatch".to_string()));
        }

        let op = serde_json::from_slice(&checked[HEADER_SIZE..])
            .map_err(|e| corruption(format!("undecodable operation: {}", e)))?;
        Ok(Decoded::Record(op, record_length))
    }
}
