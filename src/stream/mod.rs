// SPDX-License-Identifier: Apache-2.0

//! Checkpointed local tailing of rotated log streams.
//!
//! A stream is a directory of daily files named `<stream>.<YYYY-MM-DD>.lsps`.
//! Features:
//! - Per-file byte offsets persisted beside each log file
//! - Line budget per processing call
//! - Expiry of fully-read files older than the retention window

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod name;
pub mod persistence;
pub mod processor;
pub mod sink;
pub mod writer;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::{ProcessOptions, StreamConfig};
pub use error::{BoxError, Error, Result};
pub use input::{LineReader, LogFile, StreamDirectory};
pub use name::StreamName;
pub use persistence::{CheckpointStore, SiblingCheckpointStore};
pub use processor::{ProcessSummary, StreamProcessor};
pub use sink::{LineSink, StdoutSink};
pub use writer::StreamWriters;

/// Suffix shared by every log file of every stream.
pub const LOG_FILE_SUFFIX: &str = "lsps";
