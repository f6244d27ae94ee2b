// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::time::Duration;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_REMOTE_USER: &str = "root";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Remote entry point; its diagnostics go to stderr, so keep them quiet
pub const DEFAULT_REMOTE_COMMAND: &[&str] = &["lsps", "--log-level", "warn"];

/// Login used on the remote host
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    /// Password login; key or agent authentication when absent
    pub password: Option<String>,
}

impl Credentials {
    pub fn password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: Some(password.into()),
        }
    }

    pub fn key(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: None,
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::key(DEFAULT_REMOTE_USER)
    }
}

// Keep the password out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Host to pull a stream from
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            credentials,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.credentials.user, self.host, self.port)
    }
}

/// How the remote side is reached and invoked
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Command run on the remote host; the stream name is appended
    pub remote_command: Vec<String>,
    /// Give up establishing the connection after this long
    pub connect_timeout: Duration,
    /// Local ssh client
    pub ssh_program: String,
    /// Local helper feeding the password to ssh
    pub sshpass_program: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            remote_command: DEFAULT_REMOTE_COMMAND
                .iter()
                .map(|s| s.to_string())
                .collect(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ssh_program: "ssh".to_string(),
            sshpass_program: "sshpass".to_string(),
        }
    }
}

impl RemoteConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.remote_command.is_empty() || self.remote_command[0].is_empty() {
            return Err("remote command must not be empty".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("connect timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}
