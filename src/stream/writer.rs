// SPDX-License-Identifier: Apache-2.0

//! Writer side of a stream: one line per event into the current day's file.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::stream::LOG_FILE_SUFFIX;
use crate::stream::error::{Error, Result};
use crate::stream::name::StreamName;

/// Factory of per-stream daily-rolling writers.
///
/// A writer is created the first time a stream is appended to and lives as
/// long as the factory. Files roll over at UTC midnight and are named
/// `<stream>.<YYYY-MM-DD>.lsps` inside `<base_dir>/<stream>/`.
pub struct StreamWriters {
    base_dir: PathBuf,
    writers: HashMap<StreamName, RollingFileAppender>,
}

impl StreamWriters {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            writers: HashMap::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append `message` as one line to the current file of `stream`.
    ///
    /// A message containing newlines shows up as several lines to readers.
    pub fn append(&mut self, stream: &StreamName, message: &str) -> Result<()> {
        let writer = match self.writers.entry(stream.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let appender = open_appender(&self.base_dir, stream)?;
                entry.insert(appender)
            }
        };

        let mut record = Vec::with_capacity(message.len() + 1);
        record.extend_from_slice(message.as_bytes());
        record.push(b'\n');
        writer.write_all(&record)?;
        writer.flush()?;
        Ok(())
    }
}

fn open_appender(base_dir: &Path, stream: &StreamName) -> Result<RollingFileAppender> {
    let dir = base_dir.join(stream.as_str());
    fs::create_dir_all(&dir)?;
    debug!(dir = ?dir, stream = %stream, "Opening stream writer.");

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(stream.as_str())
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&dir)
        .map_err(|e| Error::Writer(format!("failed to open writer for {}: {}", stream, e)))
}
