//! # JSON Array Log File
//!
//! One append-only JSON array per session:
//!
//! ```text
//! [
//! {"device_type":"vehicle",...},
//! {"device_type":"beacon",...}
//! ]
//! ```
//!
//! The first batch is written in a single pass. Later batches are spliced
//! in by seeking to the closing `"\n]"`, overwriting it with `",\n"`, the
//! new records and a fresh `"\n]"`. Appending therefore costs O(new data)
//! and never rewrites earlier records. A file that does not end in the
//! closing bracket is treated as corrupt and recreated.
//!
//! All file handles are scoped to a single call and closed on every exit
//! path, including the recovery branch.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{BaseStationError, Result};

/// Opening of the array, written once when the file is created
pub const ARRAY_OPEN: &[u8] = b"[\n";

/// Closing of the array, rewritten after every batch
pub const ARRAY_CLOSE: &[u8] = b"\n]";

/// Separator between two records
pub const RECORD_SEPARATOR: &[u8] = b",\n";

/// Smallest file holding at least one record: `[\n{}\n]`
const MIN_SPLICE_SIZE: u64 = 6;

/// What an append did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Empty batch; file untouched
    Unchanged,
    /// File did not exist and was created
    Created,
    /// Records spliced before the closing bracket
    Spliced,
    /// File was corrupt; prior content discarded and file recreated
    Recreated,
}

/// Append-only JSON array file at a fixed path
#[derive(Debug, Clone)]
pub struct JsonArrayLog {
    path: PathBuf,
}

impl JsonArrayLog {
    /// Manage the log at `path`; nothing is created until the first append
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of records
    ///
    /// # Arguments
    ///
    /// * `records` - Records to append, each serialized as one flat object
    ///
    /// # Returns
    ///
    /// * `Result<AppendOutcome>` - How the file was changed
    ///
    /// # Errors
    ///
    /// Returns error if a record cannot be serialized (the file is not
    /// touched) or on any I/O failure
    pub fn append<T: Serialize>(&self, records: &[T]) -> Result<AppendOutcome> {
        if records.is_empty() {
            return Ok(AppendOutcome::Unchanged);
        }

        let body = encode_records(records)?;

        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.create(&body)?;
                debug!("Created log {} with {} records", self.path.display(), records.len());
                return Ok(AppendOutcome::Created);
            }
            Err(e) => return Err(e.into()),
        };

        match self.splice(size, &body) {
            Ok(()) => Ok(AppendOutcome::Spliced),
            Err(BaseStationError::CorruptLogFile(reason)) => {
                warn!(
                    "Log {} is corrupt ({}); discarding {} bytes and recreating",
                    self.path.display(),
                    reason,
                    size
                );
                self.create(&body)?;
                Ok(AppendOutcome::Recreated)
            }
            Err(e) => Err(e),
        }
    }

    /// Write a fresh array holding `body`
    fn create(&self, body: &[u8]) -> Result<()> {
        let mut contents = Vec::with_capacity(ARRAY_OPEN.len() + body.len() + ARRAY_CLOSE.len());
        contents.extend_from_slice(ARRAY_OPEN);
        contents.extend_from_slice(body);
        contents.extend_from_slice(ARRAY_CLOSE);

        let mut file = File::create(&self.path)?;
        file.write_all(&contents)?;
        file.sync_data()?;
        Ok(())
    }

    /// Insert `body` before the closing bracket of an existing array
    fn splice(&self, size: u64, body: &[u8]) -> Result<()> {
        if size < MIN_SPLICE_SIZE {
            return Err(BaseStationError::CorruptLogFile(format!(
                "{} bytes is too small for a closed array",
                size
            )));
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;

        let mut head = [0u8; 1];
        file.read_exact(&mut head)?;
        if head[0] != b'[' {
            return Err(BaseStationError::CorruptLogFile(
                "missing opening bracket".to_string(),
            ));
        }

        let close_at = size - ARRAY_CLOSE.len() as u64;
        let mut tail = [0u8; 2];
        file.seek(SeekFrom::Start(close_at))?;
        file.read_exact(&mut tail)?;
        if tail != ARRAY_CLOSE {
            return Err(BaseStationError::CorruptLogFile(
                "missing closing bracket".to_string(),
            ));
        }

        let mut splice = Vec::with_capacity(RECORD_SEPARATOR.len() + body.len() + ARRAY_CLOSE.len());
        splice.extend_from_slice(RECORD_SEPARATOR);
        splice.extend_from_slice(body);
        splice.extend_from_slice(ARRAY_CLOSE);

        file.seek(SeekFrom::Start(close_at))?;
        file.write_all(&splice)?;
        file.sync_data()?;
        Ok(())
    }
}

/// Serialize records as objects separated by `",\n"`
fn encode_records<T: Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            body.extend_from_slice(RECORD_SEPARATOR);
        }
        serde_json::to_writer(&mut body, record)?;
    }
    Ok(body)
}
