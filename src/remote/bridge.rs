// SPDX-License-Identifier: Apache-2.0

use tracing::{error, info, info_span, warn};

use crate::remote::config::{RemoteConfig, RemoteTarget};
use crate::remote::ssh::{RemoteExecutor, SshExecutor};
use crate::stream::error::{Error, Result};
use crate::stream::name::StreamName;
use crate::stream::sink::LineSink;

/// What a remote processing call did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSummary {
    /// Lines accepted by the local sink
    pub delivered: usize,
    /// Size of the remote error output
    pub stderr_bytes: usize,
    /// Remote command ran to a successful exit and every line was accepted
    pub succeeded: bool,
}

/// Re-runs stream processing on a remote host and relays its output.
///
/// The remote side checkpoints as it prints, so lines relayed here are
/// already committed there: a local sink failure loses the rest of the batch.
#[derive(Debug)]
pub struct RemoteStreamBridge<E = SshExecutor> {
    executor: E,
    remote_command: Vec<String>,
}

impl RemoteStreamBridge<SshExecutor> {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        config.validate().map_err(Error::Config)?;
        Ok(Self::with_executor(
            SshExecutor::new(config),
            config.remote_command.clone(),
        ))
    }
}

impl<E: RemoteExecutor> RemoteStreamBridge<E> {
    pub fn with_executor(executor: E, remote_command: Vec<String>) -> Self {
        Self {
            executor,
            remote_command,
        }
    }

    /// Process `stream` on `target`, feeding its output lines to `sink`.
    ///
    /// Never fails: connection, remote and sink errors are logged and the
    /// summary tells how far delivery got.
    pub fn process_remote<K>(
        &self,
        stream: &StreamName,
        sink: &mut K,
        target: &RemoteTarget,
    ) -> RemoteSummary
    where
        K: LineSink + ?Sized,
    {
        let _span = info_span!("process_remote", stream = %stream, host = %target.host).entered();
        info!(port = target.port, "Processing remote stream.");

        let mut command = self.remote_command.clone();
        command.push(stream.to_string());

        let output = match self.executor.execute(target, &command) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Remote processing failed.");
                return RemoteSummary::default();
            }
        };

        let mut summary = RemoteSummary {
            stderr_bytes: output.stderr.len(),
            ..Default::default()
        };
        if !output.stderr.is_empty() {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "Remote error output."
            );
        }

        let mut sink_ok = true;
        for line in output.lines() {
            if let Err(e) = sink.accept(line) {
                error!(error = %e, delivered = summary.delivered, "Sink failed on remote line.");
                sink_ok = false;
                break;
            }
            summary.delivered += 1;
        }

        if !output.success {
            error!(exit_code = ?output.exit_code, "Remote command failed.");
        }
        summary.succeeded = output.success && sink_ok;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::config::Credentials;
    use crate::remote::ssh::RemoteOutput;
    use crate::stream::error::BoxError;
    use std::cell::RefCell;

    struct CannedExecutor {
        output: RemoteOutput,
        commands: RefCell<Vec<Vec<String>>>,
    }

    impl CannedExecutor {
        fn new(stdout: &str, stderr: &str, success: bool) -> Self {
            Self {
                output: RemoteOutput {
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: stderr.as_bytes().to_vec(),
                    exit_code: Some(if success { 0 } else { 1 }),
                    success,
                },
                commands: RefCell::new(Vec::new()),
            }
        }
    }

    impl RemoteExecutor for CannedExecutor {
        fn execute(&self, _: &RemoteTarget, command: &[String]) -> Result<RemoteOutput> {
            self.commands.borrow_mut().push(command.to_vec());
            Ok(self.output.clone())
        }
    }

    fn target() -> RemoteTarget {
        RemoteTarget::new("web1", Credentials::default())
    }

    fn collect(
        bridge: &RemoteStreamBridge<CannedExecutor>,
        stream: &str,
    ) -> (RemoteSummary, Vec<String>) {
        let mut lines = Vec::new();
        let mut sink = |line: &[u8]| -> std::result::Result<(), BoxError> {
            lines.push(String::from_utf8_lossy(line).into_owned());
            Ok(())
        };
        let summary =
            bridge.process_remote(&StreamName::new(stream).unwrap(), &mut sink, &target());
        (summary, lines)
    }

    #[test]
    fn test_relays_lines_in_order() {
        let bridge = RemoteStreamBridge::with_executor(
            CannedExecutor::new("a\nb\nc\n", "", true),
            vec!["lsps".to_string()],
        );
        let (summary, lines) = collect(&bridge, "app");

        assert_eq!(lines, vec!["a", "b", "c"]);
        assert_eq!(
            summary,
            RemoteSummary {
                delivered: 3,
                stderr_bytes: 0,
                succeeded: true
            }
        );
        assert_eq!(
            *bridge.executor.commands.borrow(),
            vec![vec!["lsps".to_string(), "app".to_string()]]
        );
    }

    #[test]
    fn test_single_empty_line_is_relayed() {
        let bridge = RemoteStreamBridge::with_executor(
            CannedExecutor::new("\n", "", true),
            vec!["lsps".to_string()],
        );
        let (summary, lines) = collect(&bridge, "app");

        assert_eq!(lines, vec![""]);
        assert_eq!(summary.delivered, 1);
        assert!(summary.succeeded);
    }

    #[test]
    fn test_stderr_is_not_fatal() {
        let bridge = RemoteStreamBridge::with_executor(
            CannedExecutor::new("a\n", "warning: something\n", true),
            vec!["lsps".to_string()],
        );
        let (summary, lines) = collect(&bridge, "app");

        assert_eq!(lines, vec!["a"]);
        assert_eq!(summary.stderr_bytes, 19);
        assert!(summary.succeeded);
    }

    #[test]
    fn test_failed_remote_still_delivers_captured_output() {
        let bridge = RemoteStreamBridge::with_executor(
            CannedExecutor::new("a\n", "boom\n", false),
            vec!["lsps".to_string()],
        );
        let (summary, lines) = collect(&bridge, "app");

        assert_eq!(lines, vec!["a"]);
        assert!(!summary.succeeded);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let bridge = RemoteStreamBridge::with_executor(
            CannedExecutor::new("a\nb\nc\n", "", true),
            vec!["lsps".to_string()],
        );
        let mut seen = 0;
        let mut sink = |line: &[u8]| -> std::result::Result<(), BoxError> {
            seen += 1;
            if line == b"b" {
                return Err("full".into());
            }
            Ok(())
        };
        let summary =
            bridge.process_remote(&StreamName::new("app").unwrap(), &mut sink, &target());

        assert_eq!(seen, 2);
        assert_eq!(summary.delivered, 1);
        assert!(!summary.succeeded);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RemoteConfig {
            remote_command: vec![],
            ..Default::default()
        };
        assert!(matches!(
            RemoteStreamBridge::new(&config),
            Err(Error::Config(_))
        ));
    }
}
