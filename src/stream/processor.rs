// SPDX-License-Identifier: Apache-2.0

//! Single-shot catch-up over the files of one stream.
//!
//! For each file, in name order: resume at its checkpoint, hand every unread
//! line to the sink until the line budget runs out, then persist the new
//! offset. Fully-read files past the retention window are deleted along with
//! their checkpoint.
//!
//! Delivery of a line that the sink rejects is not retried: the offset is
//! advanced past a line as soon as it is read, so a failing line counts as
//! consumed whether or not the failure aborts the call.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::stream::clock::Clock;
use crate::stream::config::{ProcessOptions, StreamConfig};
use crate::stream::error::{Error, Result};
use crate::stream::input::{LineReader, LogFile, StreamDirectory};
use crate::stream::name::StreamName;
use crate::stream::persistence::{CheckpointStore, SiblingCheckpointStore};
use crate::stream::sink::{self, LineSink};

/// What a processing call did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Lines handed to the sink, including rejected ones
    pub delivered: usize,
    /// Lines the sink rejected
    pub failed: usize,
    /// Files opened
    pub files_seen: usize,
    /// Expired files removed
    pub files_deleted: usize,
}

impl ProcessSummary {
    fn budget_left(&self, opts: &ProcessOptions) -> bool {
        self.delivered < opts.max_lines
    }
}

/// Local stream processor.
///
/// Runs on demand and never waits for new data; polling is up to the caller.
/// At most one processor may work on a given stream at a time.
#[derive(Debug)]
pub struct StreamProcessor<S = SiblingCheckpointStore> {
    directory: StreamDirectory,
    checkpoints: S,
    max_line_bytes: usize,
}

impl StreamProcessor<SiblingCheckpointStore> {
    /// Processor keeping checkpoints next to the log files
    pub fn new(config: &StreamConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        Ok(Self::with_parts(
            StreamDirectory::new(config.base_dir.clone(), config.retention),
            SiblingCheckpointStore::new(),
            config.max_line_bytes,
        ))
    }
}

impl<S: CheckpointStore> StreamProcessor<S> {
    pub fn with_parts(directory: StreamDirectory, checkpoints: S, max_line_bytes: usize) -> Self {
        Self {
            directory,
            checkpoints,
            max_line_bytes,
        }
    }

    /// Replace the clock used to judge file expiry
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.directory = self.directory.with_clock(clock);
        self
    }

    pub fn directory(&self) -> &StreamDirectory {
        &self.directory
    }

    pub fn checkpoints(&self) -> &S {
        &self.checkpoints
    }

    /// Deliver unread lines of `stream` to `sink`, at most `opts.max_lines`.
    ///
    /// When the sink fails and `opts.omit_errors` is false, the offset past
    /// the failing line is persisted and the failure is returned, skipping the
    /// rest of this file and all later files. With `omit_errors` the failure
    /// is logged and processing continues with the next line, unless the
    /// sink reports a broken pipe, which always ends the call.
    pub fn process<K>(
        &self,
        stream: &StreamName,
        sink: &mut K,
        opts: ProcessOptions,
    ) -> Result<ProcessSummary>
    where
        K: LineSink + ?Sized,
    {
        let _span = info_span!("process", stream = %stream).entered();
        let mut summary = ProcessSummary::default();

        for file in self.directory.list_files(stream)? {
            if !summary.budget_left(&opts) {
                debug!("Line budget exhausted.");
                break;
            }
            summary.files_seen += 1;
            self.process_file(&file, sink, &opts, &mut summary)?;
        }

        debug!(
            delivered = summary.delivered,
            failed = summary.failed,
            files_deleted = summary.files_deleted,
            "Finished processing stream."
        );
        Ok(summary)
    }

    fn process_file<K>(
        &self,
        file: &LogFile,
        sink: &mut K,
        opts: &ProcessOptions,
        summary: &mut ProcessSummary,
    ) -> Result<()>
    where
        K: LineSink + ?Sized,
    {
        let path = &file.path;
        let stored = self.checkpoints.load(path);
        let mut reader = LineReader::open(path, stored, self.max_line_bytes)?;
        info!(path = ?path, offset = reader.offset(), "Start from position.");

        let mut line = Vec::new();
        if !reader.next_line(&mut line)? {
            debug!(path = ?path, "No new lines.");
            if self.directory.is_expired(file, reader.offset())? {
                self.directory.delete(file, &self.checkpoints)?;
                summary.files_deleted += 1;
            }
            return Ok(());
        }

        loop {
            summary.delivered += 1;
            if let Err(e) = sink.accept(&line) {
                summary.failed += 1;
                error!(path = ?path, offset = reader.offset(), error = %e, "Sink failed.");
                if !opts.omit_errors || sink::is_terminal(&e) {
                    if let Err(save_err) = self.checkpoints.save(path, reader.offset()) {
                        warn!(path = ?path, error = %save_err, "Failed to save checkpoint after sink failure.");
                    }
                    return Err(Error::Sink {
                        path: path.clone(),
                        source: e,
                    });
                }
            }

            if !summary.budget_left(opts) || !reader.next_line(&mut line)? {
                break;
            }
        }

        self.checkpoints.save(path, reader.offset())
    }
}
