// SPDX-License-Identifier: Apache-2.0

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::stream::error::Result;

/// Suffix of the hidden checkpoint file kept next to each log file
const CHECKPOINT_SUFFIX: &str = "counter";

/// Durable record of how many bytes of a log file have been consumed.
///
/// Only one processor may use a store for a given stream at a time; there is
/// no locking.
pub trait CheckpointStore {
    /// Offset to resume from. Missing or unreadable checkpoints resume at 0.
    fn load(&self, log_file: &Path) -> u64;

    /// Replace the stored offset.
    fn save(&self, log_file: &Path, offset: u64) -> Result<()>;

    /// Remove the checkpoint. Returns false when none existed.
    fn remove(&self, log_file: &Path) -> io::Result<bool>;

    /// Where the checkpoint for `log_file` lives, for diagnostics.
    fn location(&self, log_file: &Path) -> PathBuf;
}

/// Path of the checkpoint for `log_file`: `<dir>/.<file name>.counter`
pub fn checkpoint_path(log_file: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    if let Some(file_name) = log_file.file_name() {
        name.push(file_name);
    }
    name.push(".");
    name.push(CHECKPOINT_SUFFIX);
    log_file.with_file_name(name)
}

/// Stores each checkpoint as a plain-text sibling of its log file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SiblingCheckpointStore;

impl SiblingCheckpointStore {
    pub fn new() -> Self {
        Self
    }
}

impl CheckpointStore for SiblingCheckpointStore {
    fn load(&self, log_file: &Path) -> u64 {
        let path = checkpoint_path(log_file);
        match fs::read_to_string(&path) {
            Ok(content) => parse_offset(&content).unwrap_or_else(|| {
                warn!(path = ?path, content = %content.trim(), "Ignoring malformed checkpoint.");
                0
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read checkpoint, starting from 0.");
                0
            }
        }
    }

    fn save(&self, log_file: &Path, offset: u64) -> Result<()> {
        let path = checkpoint_path(log_file);
        atomic_write(&path, offset.to_string().as_bytes())?;
        debug!(path = ?path, offset, "Saved checkpoint.");
        Ok(())
    }

    fn remove(&self, log_file: &Path) -> io::Result<bool> {
        match fs::remove_file(checkpoint_path(log_file)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn location(&self, log_file: &Path) -> PathBuf {
        checkpoint_path(log_file)
    }
}

/// Decimal digits only, surrounding whitespace allowed.
fn parse_offset(content: &str) -> Option<u64> {
    let digits = content.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Write content to file atomically (write to temp, then rename)
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use portable_atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    // Process ID plus counter keeps temp names unique across threads
    let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(format!(".tmp.{}.{}", std::process::id(), unique_id));
    let temp_path = path.with_file_name(temp_name);

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// In-memory store for unit tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    offsets: std::sync::Mutex<std::collections::HashMap<PathBuf, u64>>,
}

#[cfg(test)]
impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, log_file: &Path) -> Option<u64> {
        self.offsets.lock().unwrap().get(log_file).copied()
    }
}

#[cfg(test)]
impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, log_file: &Path) -> u64 {
        self.get(log_file).unwrap_or(0)
    }

    fn save(&self, log_file: &Path, offset: u64) -> Result<()> {
        self.offsets
            .lock()
            .unwrap()
            .insert(log_file.to_path_buf(), offset);
        Ok(())
    }

    fn remove(&self, log_file: &Path) -> io::Result<bool> {
        Ok(self.offsets.lock().unwrap().remove(log_file).is_some())
    }

    fn location(&self, log_file: &Path) -> PathBuf {
        log_file.to_path_buf()
    }
}
