//! Durable document collection
//!
//! An append-only operation log in front of a `MemoryCollection`:
//! - Every successful mutation is appended as one checksummed record
//! - With `fsync` enabled the record is synced before the call returns
//! - Opening replays the log into memory
//!
//! A record cut off at the end of the log (crash mid-append) is
//! truncated away on open. A checksum failure anywhere else is fatal.
//!
//! A mutation becomes visible only once its record is written. When the
//! append fails the in-memory change is taken back and the partial
//! record cut off the log; if even that cut fails the log refuses all
//! further writes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::backend::DocumentCollection;
use super::document::{ensure_id, Document, ObjectId};
use super::errors::{CollectionError, CollectionResult};
use super::filter::{Filter, FindOptions, Update};
use super::index::IndexModel;
use super::memory::MemoryCollection;
use super::record::{Decoded, LogOp};
use crate::observability::{log_event, Event};

struct LogWriter {
    file: File,
    offset: u64,
    /// Set when a failed append could not be cut back off the log.
    failed: bool,
}

/// Collection persisted to `<data_dir>/<name>.log`.
pub struct FileCollection {
    inner: MemoryCollection,
    log: Mutex<LogWriter>,
    path: PathBuf,
    fsync: bool,
}

impl FileCollection {
    /// Opens or creates the collection log and replays it.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::Corruption` if a complete record fails
    /// its checksum or cannot be replayed.
    pub fn open(data_dir: &Path, name: &str, fsync: bool) -> CollectionResult<Self> {
        fs::create_dir_all(data_dir)?;
        let path = Self::log_path(data_dir, name);

        let inner = MemoryCollection::new(name);
        let (records, valid_len, file_len) = Self::replay(&path, &inner)?;

        if file_len > valid_len {
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            let (from, to) = (file_len.to_string(), valid_len.to_string());
            log_event(
                Event::CollectionTailTruncated,
                &[("collection", name), ("from", from.as_str()), ("to", to.as_str())],
            );
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let records = records.to_string();
        log_event(
            Event::CollectionReplayed,
            &[("collection", name), ("records", records.as_str())],
        );

        Ok(Self {
            inner,
            log: Mutex::new(LogWriter {
                file,
                offset: valid_len,
                failed: false,
            }),
            path,
            fsync,
        })
    }

    /// Where the log of collection `name` lives under `data_dir`.
    pub fn log_path(data_dir: &Path, name: &str) -> PathBuf {
        data_dir.join(format!("{}.log", name))
    }

    /// Path of the operation log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of log written so far.
    pub fn log_size(&self) -> CollectionResult<u64> {
        Ok(self.lock()?.offset)
    }

    /// Returns (records applied, bytes of valid log, bytes on disk).
    fn replay(path: &Path, inner: &MemoryCollection) -> CollectionResult<(usize, u64, u64)> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, 0, 0)),
            Err(e) => return Err(e.into()),
        };

        let mut offset = 0usize;
        let mut records = 0usize;
        while offset < data.len() {
            match LogOp::decode(&data[offset..], offset as u64)? {
                Decoded::Record(op, size) => {
                    if let Some(id) = op.document().and_then(ObjectId::of) {
                        ObjectId::observe(id);
                    }
                    inner.apply(&op).map_err(|e| CollectionError::Corruption {
                        offset: offset as u64,
                        reason: format!("replay failed: {}", e),
                    })?;
                    offset += size;
                    records += 1;
                }
                Decoded::Torn => break,
            }
        }
        Ok((records, offset as u64, data.len() as u64))
    }

    fn lock(&self) -> CollectionResult<MutexGuard<'_, LogWriter>> {
        self.log
            .lock()
            .map_err(|_| CollectionError::Internal("Lock poisoned".to_string()))
    }

    fn append(&self, log: &mut LogWriter, record: &[u8]) -> CollectionResult<()> {
        let written = log.file.write_all(record).and_then(|()| {
            if self.fsync {
                log.file.sync_all()
            } else {
                Ok(())
            }
        });
        match written {
            Ok(()) => {
                log.offset += record.len() as u64;
                Ok(())
            }
            Err(e) => {
                let offset = log.offset.to_string();
                let error = e.to_string();
                if log.file.set_len(log.offset).is_err() {
                    log.failed = true;
                }
                log_event(
                    Event::CollectionAppendFailed,
                    &[
                        ("collection", self.name()),
                        ("offset", offset.as_str()),
                        ("error", error.as_str()),
                    ],
                );
                Err(e.into())
            }
        }
    }

    /// Applies `op` in memory and logs it if it changed anything. The
    /// operation's document gets its `_id` here, under the log lock, so
    /// ids grow in log order.
    fn mutate(&self, mut op: LogOp) -> CollectionResult<(u64, Option<ObjectId>)> {
        let mut log = self.lock()?;
        if log.failed {
            return Err(CollectionError::Io(format!(
                "log {} has an unremovable partial record",
                self.path.display()
            )));
        }
        let id = op.document_mut().map(ensure_id);
        let record = op.encode()?;
        let changed = self.inner.apply_then(&op, |changed| {
            if changed > 0 {
                self.append(&mut log, &record)
            } else {
                Ok(())
            }
        })?;
        Ok((changed, id))
    }
}

impl DocumentCollection for FileCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn insert_one(&self, document: Document) -> CollectionResult<ObjectId> {
        let (_, id) = self.mutate(LogOp::Insert { document })?;
        id.ok_or_else(|| CollectionError::Internal("insert without a document id".to_string()))
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> CollectionResult<Vec<Document>> {
        self.inner.find(filter, options)
    }

    fn count(&self, filter: &Filter) -> CollectionResult<u64> {
        self.inner.count(filter)
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> CollectionResult<u64> {
        self.mutate(LogOp::UpdateOne {
            filter: filter.clone(),
            update: update.clone(),
        })
        .map(|(n, _)| n)
    }

    fn update_many(&self, filter: &Filter, update: &Update) -> CollectionResult<u64> {
        self.mutate(LogOp::UpdateMany {
            filter: filter.clone(),
            update: update.clone(),
        })
        .map(|(n, _)| n)
    }

    fn replace_one(&self, filter: &Filter, document: Document, upsert: bool) -> CollectionResult<u64> {
        self.mutate(LogOp::Replace {
            filter: filter.clone(),
            document,
            upsert,
        })
        .map(|(n, _)| n)
    }

    fn delete_many(&self, filter: &Filter) -> CollectionResult<u64> {
        self.mutate(LogOp::Delete {
            filter: filter.clone(),
        })
        .map(|(n, _)| n)
    }

    fn drop_all(&self) -> CollectionResult<()> {
        self.mutate(LogOp::Drop).map(|_| ())
    }

    fn create_index(&self, index: IndexModel) -> CollectionResult<()> {
        self.mutate(LogOp::CreateIndex { index }).map(|_| ())
    }

    fn indexes(&self) -> CollectionResult<Vec<IndexModel>> {
        self.inner.indexes()
    }
}
