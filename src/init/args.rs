// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::remote::config::{
    Credentials, DEFAULT_REMOTE_USER, DEFAULT_SSH_PORT, RemoteConfig, RemoteTarget,
};
use crate::stream::config::{
    DEFAULT_BASE_DIR, DEFAULT_MAX_LINE_BYTES, DEFAULT_RETENTION, ProcessOptions, StreamConfig,
};

#[derive(Debug, Args, Clone)]
pub struct StreamArgs {
    /// Directory holding one sub-directory per stream
    #[arg(long, env = "LSPS_BASE_DIR", default_value = DEFAULT_BASE_DIR)]
    pub base_dir: PathBuf,

    /// Limit at most max-lines log lines processed per stream
    #[arg(long, env = "LSPS_MAX_LINES", default_value = "1000")]
    pub max_lines: usize,

    /// Seconds after which a fully read log file is deleted
    #[arg(long, env = "LSPS_RETENTION_SECS", default_value = "86400")]
    pub retention_secs: u64,

    /// Maximum line size in bytes (longer lines are split)
    #[arg(long, env = "LSPS_MAX_LINE_BYTES", default_value = "65536")]
    pub max_line_bytes: usize,
}

impl Default for StreamArgs {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            max_lines: 1000,
            retention_secs: DEFAULT_RETENTION.as_secs(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl StreamArgs {
    /// Build the stream config from command line args
    pub fn build_config(&self) -> StreamConfig {
        StreamConfig {
            base_dir: self.base_dir.clone(),
            retention: Duration::from_secs(self.retention_secs),
            max_line_bytes: self.max_line_bytes,
        }
    }

    /// Options for command line processing: a rejected line is skipped, but a
    /// closed stdout ends the pass
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions::default()
            .omit_errors(true)
            .max_lines(self.max_lines)
    }
}

#[derive(Debug, Args, Clone)]
pub struct RemoteArgs {
    /// Pull the streams from this host over ssh instead of reading local files
    #[arg(long, env = "LSPS_REMOTE_HOST")]
    pub remote_host: Option<String>,

    /// ssh port of the remote host
    #[arg(long, env = "LSPS_REMOTE_PORT", default_value_t = DEFAULT_SSH_PORT)]
    pub remote_port: u16,

    /// Remote login user
    #[arg(long, env = "LSPS_REMOTE_USER", default_value = DEFAULT_REMOTE_USER)]
    pub remote_user: String,

    /// Remote login password (key or agent authentication when unset)
    #[arg(long, env = "LSPS_REMOTE_PASSWORD", hide_env_values = true)]
    pub remote_password: Option<String>,

    /// Command running lsps on the remote host, split on whitespace
    #[arg(long, env = "LSPS_REMOTE_COMMAND")]
    pub remote_command: Option<String>,

    /// Seconds to wait for the ssh connection to be established
    #[arg(long, env = "LSPS_REMOTE_CONNECT_TIMEOUT_SECS", default_value = "5")]
    pub remote_connect_timeout_secs: u64,
}

impl RemoteArgs {
    /// Remote target and config, when a remote host was given
    pub fn build_config(&self) -> Option<(RemoteConfig, RemoteTarget)> {
        let host = self.remote_host.as_ref()?;

        let mut config = RemoteConfig {
            connect_timeout: Duration::from_secs(self.remote_connect_timeout_secs),
            ..Default::default()
        };
        if let Some(command) = &self.remote_command {
            config.remote_command = command.split_whitespace().map(String::from).collect();
        }

        let credentials = Credentials {
            user: self.remote_user.clone(),
            password: self.remote_password.clone(),
        };
        let target = RemoteTarget::new(host.clone(), credentials).with_port(self.remote_port);
        Some((config, target))
    }
}
