// SPDX-License-Identifier: Apache-2.0

//! Log stream processing.
//!
//! Writers append one event per line to per-stream, per-day files. A reader
//! incrementally tails those files, handing unread lines to a sink and
//! persisting how far it got, either locally or on a remote host over ssh.

pub mod init;
pub mod remote;
pub mod stream;
