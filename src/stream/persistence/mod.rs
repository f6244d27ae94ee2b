// SPDX-License-Identifier: Apache-2.0

//! Persistence of per-file read offsets.
//!
//! Each log file gets a hidden sibling holding the decimal byte offset that has
//! been consumed so far. Writes are atomic (write to temp, then rename).

mod checkpoint;

pub use checkpoint::{CheckpointStore, SiblingCheckpointStore, checkpoint_path};
#[cfg(test)]
pub use checkpoint::MemoryCheckpointStore;
