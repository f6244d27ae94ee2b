// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use glob::{Pattern, glob};
use tracing::{debug, info};

use crate::stream::LOG_FILE_SUFFIX;
use crate::stream::clock::{Clock, SystemClock};
use crate::stream::error::{Error, Result};
use crate::stream::name::StreamName;
use crate::stream::persistence::CheckpointStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day's file of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Full path of the file
    pub path: PathBuf,
    /// Day the writer created the file for, taken from its name
    pub date: NaiveDate,
    /// Stream the file belongs to
    pub stream: StreamName,
}

impl LogFile {
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// File name used for `stream` on `date`: `<stream>.<YYYY-MM-DD>.lsps`
pub fn log_file_name(stream: &StreamName, date: NaiveDate) -> String {
    format!(
        "{}.{}.{}",
        stream,
        date.format(DATE_FORMAT),
        LOG_FILE_SUFFIX
    )
}

/// Parse the date out of a file name belonging to `stream`
fn parse_log_file_date(stream: &StreamName, file_name: &str) -> Option<NaiveDate> {
    let date = file_name
        .strip_prefix(stream.as_str())?
        .strip_prefix('.')?
        .strip_suffix(LOG_FILE_SUFFIX)?
        .strip_suffix('.')?;
    // chrono accepts unpadded fields, the writer never produces them
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Knows where the files of each stream live and when they can go.
#[derive(Clone)]
pub struct StreamDirectory {
    base_dir: PathBuf,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StreamDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDirectory")
            .field("base_dir", &self.base_dir)
            .field("retention", &self.retention)
            .finish()
    }
}

impl StreamDirectory {
    pub fn new(base_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            retention,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to judge file age
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Directory holding the files of `stream`
    pub fn stream_dir(&self, stream: &StreamName) -> PathBuf {
        self.base_dir.join(stream.as_str())
    }

    /// Log files of `stream`, sorted by file name (and therefore by day).
    pub fn list_files(&self, stream: &StreamName) -> Result<Vec<LogFile>> {
        let dir = self.stream_dir(stream);
        if !dir.is_dir() {
            debug!(dir = ?dir, "Stream directory does not exist.");
            return Ok(Vec::new());
        }

        let dir_str = dir
            .to_str()
            .ok_or_else(|| Error::Config(format!("stream directory is not UTF-8: {:?}", dir)))?;
        let pattern = format!(
            "{}/{}.*.{}",
            Pattern::escape(dir_str),
            Pattern::escape(stream.as_str()),
            LOG_FILE_SUFFIX
        );

        let mut files = Vec::new();
        for entry in glob(&pattern).map_err(|e| Error::InvalidGlob(e.to_string()))? {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }

            let date = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| parse_log_file_date(stream, n));
            match date {
                Some(date) => files.push(LogFile {
                    path,
                    date,
                    stream: stream.clone(),
                }),
                None => debug!(path = ?path, "Skipping file that is not a log file."),
            }
        }

        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(files)
    }

    /// A file is expired once it has no unread bytes at `offset` and has not
    /// been written for the whole retention window.
    pub fn is_expired(&self, file: &LogFile, offset: u64) -> Result<bool> {
        let metadata = fs::metadata(&file.path)?;
        if offset < metadata.len() {
            return Ok(false);
        }

        let last_written = metadata.modified()?;
        let age = self
            .clock
            .now()
            .duration_since(last_written)
            .unwrap_or(Duration::ZERO);
        Ok(age >= self.retention)
    }

    /// Remove a log file and its checkpoint.
    ///
    /// The log file goes first: a leftover checkpoint is reported as an error,
    /// a leftover log file without its checkpoint would be read again from 0.
    pub fn delete(&self, file: &LogFile, checkpoints: &dyn CheckpointStore) -> Result<()> {
        fs::remove_file(&file.path)?;
        if let Err(source) = checkpoints.remove(&file.path) {
            return Err(Error::DanglingCheckpoint {
                path: file.path.clone(),
                checkpoint: checkpoints.location(&file.path),
                source,
            });
        }
        info!(path = ?file.path, "Deleted expired log file.");
        Ok(())
    }
}
