// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::warn;

/// Reads newline-terminated lines from a log file, starting at a checkpoint.
///
/// Reading stops at the file length observed when the reader was opened, so
/// data appended meanwhile is left for the next call. Lines longer than
/// `max_line_bytes` are split: each piece is returned as a line of its own.
pub struct LineReader {
    /// Path to the file
    path: PathBuf,
    /// Buffered reader positioned at `offset`
    reader: BufReader<File>,
    /// Byte position just after the last line returned
    offset: u64,
    /// File length when opened
    end: u64,
    /// Maximum size of a single line
    max_line_bytes: usize,
}

impl LineReader {
    /// Open `path` positioned at `offset`.
    ///
    /// An offset beyond the end of the file cannot belong to this file's
    /// content any more (truncated or replaced), so reading restarts at 0.
    pub fn open(path: impl AsRef<Path>, offset: u64, max_line_bytes: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let end = file.metadata()?.len();

        let offset = if offset > end {
            warn!(
                path = ?path,
                offset,
                len = end,
                "Checkpoint is past the end of the file, starting from 0."
            );
            0
        } else {
            offset
        };
        file.seek(SeekFrom::Start(offset))?;

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            end,
            max_line_bytes: max_line_bytes.max(1),
        })
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position just after the last line returned
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes left before the end observed at open
    pub fn remaining(&self) -> u64 {
        self.end - self.offset
    }

    /// Read the next line into `buf`, without its line terminator.
    ///
    /// Returns `false` once no bytes are left.
    pub fn next_line(&mut self, buf: &mut Vec<u8>) -> io::Result<bool> {
        buf.clear();
        let limit = (self.max_line_bytes as u64).min(self.remaining());
        if limit == 0 {
            return Ok(false);
        }

        let read = (&mut self.reader).take(limit).read_until(b'\n', buf)?;
        if read == 0 {
            // Shrunk underneath us
            return Ok(false);
        }
        self.offset += read as u64;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(true)
    }
}
