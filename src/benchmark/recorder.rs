//! Append-only benchmark call log
//!
//! One JSON document per line. Each record is serialized up front and
//! written with a single `write_all` while holding the append lock, so
//! concurrent writers in this process never interleave partial lines.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::CallRecord;

/// Failure to persist a call record
#[derive(Error, Debug)]
pub enum LogError {
    #[error("call log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize call record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("call log lock poisoned")]
    Poisoned,
}

/// Append-only store of `CallRecord`s
#[derive(Debug)]
pub struct CallLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CallLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub fn append(&self, record: &CallRecord) -> Result<(), LogError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().map_err(|_| LogError::Poisoned)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        debug!(
            "Logged {} ({}ms) to {}",
            record.operation,
            record.duration_ms,
            self.path.display()
        );
        Ok(())
    }

    /// Append one record, warning instead of failing
    pub fn record(&self, record: &CallRecord) {
        if let Err(e) = self.append(record) {
            warn!(
                "Failed to log {} call to {}: {}",
                record.operation,
                self.path.display(),
                e
            );
        }
    }

    /// Read every record in file order.
    ///
    /// A missing log reads as empty; unparseable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<CallRecord>, LogError> {
        read_records(&self.path)
    }
}

/// Read every record from a log file
pub fn read_records(path: &Path) -> Result<Vec<CallRecord>, LogError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CallRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping line {} of {}: {}", number + 1, path.display(), e),
        }
    }

    Ok(records)
}
