// SPDX-License-Identifier: Apache-2.0

//! Remote command execution through the local OpenSSH client.

use std::ffi::OsString;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::debug;

use crate::remote::config::{RemoteConfig, RemoteTarget};
use crate::stream::error::{Error, Result};

/// Environment variable `sshpass -e` reads the password from
const SSHPASS_ENV: &str = "SSHPASS";

/// Everything a finished remote command produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoteOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, if the command exited normally
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl RemoteOutput {
    /// Standard output split into lines, without terminators.
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        // An empty stdout has no lines; a lone "\n" is one empty line.
        let empty = self.stdout.is_empty();
        let stdout = self
            .stdout
            .strip_suffix(b"\n")
            .unwrap_or(self.stdout.as_slice());
        stdout
            .split(|b| *b == b'\n')
            .filter(move |_| !empty)
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
    }
}

/// Runs a command on a remote host and waits for it to finish.
pub trait RemoteExecutor {
    fn execute(&self, target: &RemoteTarget, command: &[String]) -> Result<RemoteOutput>;
}

/// [`RemoteExecutor`] spawning `ssh`, wrapped in `sshpass` for password logins.
///
/// Unknown host keys are accepted on first contact.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    ssh_program: String,
    sshpass_program: String,
    connect_timeout: Duration,
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self::new(&RemoteConfig::default())
    }
}

impl SshExecutor {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            ssh_program: config.ssh_program.clone(),
            sshpass_program: config.sshpass_program.clone(),
            connect_timeout: config.connect_timeout,
        }
    }

    /// The local process that runs `command` on `target`
    pub fn command(&self, target: &RemoteTarget, command: &[String]) -> Command {
        let mut cmd = match &target.credentials.password {
            Some(password) => {
                let mut cmd = Command::new(&self.sshpass_program);
                cmd.arg("-e").arg(&self.ssh_program).env(SSHPASS_ENV, password);
                cmd
            }
            None => Command::new(&self.ssh_program),
        };

        let timeout_secs = self.connect_timeout.as_secs().max(1);
        cmd.args(["-o", "StrictHostKeyChecking=no"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", timeout_secs));
        if target.credentials.password.is_none() {
            // Never fall back to an interactive prompt
            cmd.args(["-o", "BatchMode=yes"]);
        }
        cmd.arg("-p")
            .arg(target.port.to_string())
            .arg("--")
            .arg(format!("{}@{}", target.credentials.user, target.host))
            .arg(remote_command_line(command));

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl RemoteExecutor for SshExecutor {
    fn execute(&self, target: &RemoteTarget, command: &[String]) -> Result<RemoteOutput> {
        let mut cmd = self.command(target, command);
        let program: OsString = cmd.get_program().to_os_string();
        debug!(target = %target, command = ?command, "Running remote command.");

        let output = cmd.output().map_err(|source| Error::RemoteSpawn {
            program: program.to_string_lossy().into_owned(),
            source,
        })?;

        Ok(RemoteOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

/// Join `command` into one line for the remote shell, quoting as needed
pub fn remote_command_line(command: &[String]) -> String {
    command
        .iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./=:@+,%".contains(&b));
    if plain {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}
