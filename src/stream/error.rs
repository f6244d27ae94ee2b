// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by sinks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stream name {0:?}: {1}")]
    InvalidStreamName(String, &'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("Sink rejected line from {path}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Removed {path} but its checkpoint {checkpoint} remains: {source}")]
    DanglingCheckpoint {
        path: PathBuf,
        checkpoint: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Writer error: {0}")]
    Writer(String),

    #[error("Failed to start remote command {program}: {source}")]
    RemoteSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
