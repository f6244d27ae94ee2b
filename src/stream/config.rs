// SPDX-License-Identifier: Apache-2.0

//! Configuration for local stream processing.

use std::path::PathBuf;
use std::time::Duration;

/// Root directory holding one sub-directory per stream.
#[cfg(unix)]
pub const DEFAULT_BASE_DIR: &str = "/tmp/lsps";
#[cfg(not(unix))]
pub const DEFAULT_BASE_DIR: &str = ".";

/// Fully-read files older than this are deleted.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Lines longer than this are cut into several deliveries.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Default line budget of a single processing call.
pub const DEFAULT_MAX_LINES: usize = 5000;

/// Where streams live and how their files are read.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Directory containing one sub-directory per stream
    pub base_dir: PathBuf,
    /// Age after which a fully-read file is deleted
    pub retention: Duration,
    /// Maximum size of a single delivered line in bytes
    pub max_line_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            retention: DEFAULT_RETENTION,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl StreamConfig {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_line_bytes == 0 {
            return Err("max_line_bytes must be greater than zero".to_string());
        }
        if self.base_dir.as_os_str().is_empty() {
            return Err("base_dir must not be empty".to_string());
        }
        Ok(())
    }
}

/// Per-call options of [`StreamProcessor::process`](crate::stream::StreamProcessor::process).
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    /// Log sink failures and keep going instead of aborting the call
    pub omit_errors: bool,
    /// Maximum number of lines delivered across all files of the stream
    pub max_lines: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            omit_errors: false,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl ProcessOptions {
    pub fn omit_errors(mut self, omit_errors: bool) -> Self {
        self.omit_errors = omit_errors;
        self
    }

    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }
}
