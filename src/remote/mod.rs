// SPDX-License-Identifier: Apache-2.0

//! Running stream processing on another host and relaying its output.
//!
//! The remote host runs the same single-shot processing entry point with a
//! stdout sink; its output lines are fed to a local sink. Lines from different
//! hosts carry no ordering relative to each other.

pub mod bridge;
pub mod config;
pub mod ssh;

pub use bridge::{RemoteStreamBridge, RemoteSummary};
pub use config::{Credentials, RemoteConfig, RemoteTarget};
pub use ssh::{RemoteExecutor, RemoteOutput, SshExecutor};
