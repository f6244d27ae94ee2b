// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use crate::stream::error::BoxError;

/// Consumer of delivered lines.
///
/// Lines arrive without their terminator. Returning an error marks the line
/// as failed; see [`StreamProcessor::process`](crate::stream::StreamProcessor::process)
/// for what happens next.
pub trait LineSink {
    fn accept(&mut self, line: &[u8]) -> Result<(), BoxError>;
}

impl<F> LineSink for F
where
    F: FnMut(&[u8]) -> Result<(), BoxError>,
{
    fn accept(&mut self, line: &[u8]) -> Result<(), BoxError> {
        self(line)
    }
}

/// Whether a sink error means no later line can be accepted either.
///
/// A closed pipe on the far side of [`StdoutSink`] is the case that matters:
/// continuing would mark every remaining line consumed with nowhere to go.
pub fn is_terminal(err: &BoxError) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
}

/// Writes each line to standard output followed by a newline.
///
/// This is what the remote bridge reads back on the other end.
#[derive(Debug, Default)]
pub struct StdoutSink {
    stdout: Option<io::Stdout>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            stdout: Some(io::stdout()),
        }
    }
}

impl LineSink for StdoutSink {
    fn accept(&mut self, line: &[u8]) -> Result<(), BoxError> {
        let stdout = self.stdout.get_or_insert_with(io::stdout);
        let mut out = stdout.lock();
        out.write_all(line)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}
