// SPDX-License-Identifier: Apache-2.0

//! Local stream processing against real files and sibling checkpoints.
//!
//! Every call builds a fresh processor so state only survives through the
//! checkpoint files, the same as separate process invocations.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use lsps::stream::config::DEFAULT_RETENTION;
use lsps::stream::input::log_file_name;
use lsps::stream::persistence::checkpoint_path;
use lsps::stream::{
    BoxError, Error, MockClock, ProcessOptions, ProcessSummary, SiblingCheckpointStore,
    StreamConfig, StreamDirectory, StreamName, StreamProcessor,
};
use tempfile::TempDir;

struct TestStream {
    base: TempDir,
    name: StreamName,
    clock: Arc<MockClock>,
}

impl TestStream {
    fn new(name: &str) -> Self {
        Self {
            base: TempDir::new().unwrap(),
            name: StreamName::new(name).unwrap(),
            clock: Arc::new(MockClock::new()),
        }
    }

    fn processor(&self) -> StreamProcessor {
        StreamProcessor::new(&StreamConfig::with_base_dir(self.base.path()))
            .unwrap()
            .with_clock(self.clock.clone())
    }

    fn file(&self, day: u32) -> PathBuf {
        let dir = self.base.path().join(self.name.as_str());
        fs::create_dir_all(&dir).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        dir.join(log_file_name(&self.name, date))
    }

    fn append(&self, day: u32, lines: &[&str]) -> PathBuf {
        let path = self.file(day);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn run(&self, opts: ProcessOptions) -> (Result<ProcessSummary, Error>, Vec<String>) {
        self.run_failing_on(opts, &[])
    }

    fn run_failing_on(
        &self,
        opts: ProcessOptions,
        reject: &[&str],
    ) -> (Result<ProcessSummary, Error>, Vec<String>) {
        let mut accepted = Vec::new();
        let mut sink = |line: &[u8]| -> Result<(), BoxError> {
            let line = String::from_utf8_lossy(line).into_owned();
            if reject.contains(&line.as_str()) {
                return Err(format!("cannot take {}", line).into());
            }
            accepted.push(line);
            Ok(())
        };
        let result = self.processor().process(&self.name, &mut sink, opts);
        (result, accepted)
    }
}

fn stored_offset(log_file: &Path) -> Option<String> {
    fs::read_to_string(checkpoint_path(log_file)).ok()
}

#[test]
fn test_every_line_delivered_exactly_once_across_runs() {
    let stream = TestStream::new("orders");
    let mut delivered = Vec::new();

    stream.append(1, &["1", "2"]);
    delivered.extend(stream.run(ProcessOptions::default()).1);

    stream.append(1, &["3"]);
    delivered.extend(stream.run(ProcessOptions::default()).1);

    // Nothing new
    delivered.extend(stream.run(ProcessOptions::default()).1);

    stream.append(1, &["4"]);
    stream.append(2, &["5", "6"]);
    delivered.extend(stream.run(ProcessOptions::default()).1);

    assert_eq!(delivered, vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn test_line_budget_leaves_rest_for_next_call() {
    let stream = TestStream::new("orders");
    let lines: Vec<String> = (1..=10).map(|i| format!("line {}", i)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    stream.append(1, &refs);

    let (result, first) = stream.run(ProcessOptions::default().max_lines(4));
    assert_eq!(result.unwrap().delivered, 4);
    assert_eq!(first, &lines[..4]);

    let (result, rest) = stream.run(ProcessOptions::default().max_lines(100));
    assert_eq!(result.unwrap().delivered, 6);
    assert_eq!(rest, &lines[4..]);
}

#[test]
fn test_rotated_files_keep_separate_checkpoints() {
    let stream = TestStream::new("orders");
    let day1 = stream.append(1, &["a"]);
    let day2 = stream.append(2, &["bb"]);

    stream.run(ProcessOptions::default()).0.unwrap();
    assert_eq!(stored_offset(&day1).as_deref(), Some("2"));
    assert_eq!(stored_offset(&day2).as_deref(), Some("3"));
}

#[test]
fn test_expired_file_and_checkpoint_deleted() {
    let stream = TestStream::new("orders");
    let path = stream.append(1, &["only"]);
    stream.run(ProcessOptions::default()).0.unwrap();
    assert!(checkpoint_path(&path).exists());

    stream.clock.advance(DEFAULT_RETENTION + Duration::from_secs(1));
    let (result, lines) = stream.run(ProcessOptions::default());

    assert!(lines.is_empty());
    assert_eq!(result.unwrap().files_deleted, 1);
    assert!(!path.exists());
    assert!(!checkpoint_path(&path).exists());
}

#[test]
fn test_recent_exhausted_file_is_kept() {
    let stream = TestStream::new("orders");
    let path = stream.append(1, &["only"]);
    stream.run(ProcessOptions::default()).0.unwrap();

    stream.clock.advance(Duration::from_secs(23 * 60 * 60));
    let (result, _) = stream.run(ProcessOptions::default());

    assert_eq!(result.unwrap().files_deleted, 0);
    assert!(path.exists());
    assert!(checkpoint_path(&path).exists());
}

#[test]
fn test_failure_on_third_line_skips_it_on_retry() {
    let stream = TestStream::new("orders");
    stream.append(1, &["1", "2", "3", "4", "5"]);

    let (result, accepted) = stream.run_failing_on(ProcessOptions::default(), &["3"]);
    assert!(matches!(result, Err(Error::Sink { .. })));
    assert_eq!(accepted, vec!["1", "2"]);

    let (result, accepted) = stream.run(ProcessOptions::default());
    result.unwrap();
    assert_eq!(accepted, vec!["4", "5"]);
}

#[test]
fn test_failure_stops_later_files() {
    let stream = TestStream::new("orders");
    stream.append(1, &["1", "2"]);
    let day2 = stream.append(2, &["3"]);

    let (result, accepted) = stream.run_failing_on(ProcessOptions::default(), &["1"]);
    assert!(result.is_err());
    assert!(accepted.is_empty());
    assert_eq!(stored_offset(&day2), None);

    let (_, accepted) = stream.run(ProcessOptions::default());
    assert_eq!(accepted, vec!["2", "3"]);
}

#[test]
fn test_omitted_failure_continues_in_same_call() {
    let stream = TestStream::new("orders");
    stream.append(1, &["1", "2", "3", "4", "5"]);

    let (result, accepted) =
        stream.run_failing_on(ProcessOptions::default().omit_errors(true), &["3"]);
    let summary = result.unwrap();
    assert_eq!(accepted, vec!["1", "2", "4", "5"]);
    assert_eq!(summary.delivered, 5);
    assert_eq!(summary.failed, 1);

    let (_, accepted) = stream.run(ProcessOptions::default());
    assert!(accepted.is_empty());
}

#[test]
fn test_malformed_checkpoint_behaves_like_missing() {
    let stream = TestStream::new("orders");
    let path = stream.append(1, &["x", "y"]);
    fs::write(checkpoint_path(&path), "abc").unwrap();

    let (_, with_garbage) = stream.run(ProcessOptions::default());

    fs::remove_file(checkpoint_path(&path)).unwrap();
    let (_, without) = stream.run(ProcessOptions::default());

    assert_eq!(with_garbage, vec!["x", "y"]);
    assert_eq!(with_garbage, without);
}

#[test]
fn test_checkpoint_never_exceeds_length() {
    let stream = TestStream::new("orders");
    let path = stream.append(1, &["abc"]);
    // Writer still mid-line
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    write!(file, "partial").unwrap();

    stream.run(ProcessOptions::default()).0.unwrap();
    let offset: u64 = stored_offset(&path).unwrap().parse().unwrap();
    assert_eq!(offset, fs::metadata(&path).unwrap().len());
}

#[test]
fn test_unknown_files_are_ignored() {
    let stream = TestStream::new("orders");
    stream.append(1, &["real"]);
    let dir = stream.base.path().join("orders");
    fs::write(dir.join("orders.log"), "not a stream file\n").unwrap();
    fs::write(dir.join("README"), "hello\n").unwrap();

    let (_, lines) = stream.run(ProcessOptions::default());
    assert_eq!(lines, vec!["real"]);
}

#[test]
fn test_explicit_parts_share_checkpoint_format() {
    let stream = TestStream::new("orders");
    let path = stream.append(1, &["1", "2"]);

    let processor = StreamProcessor::with_parts(
        StreamDirectory::new(stream.base.path(), DEFAULT_RETENTION),
        SiblingCheckpointStore::new(),
        64 * 1024,
    );
    let mut count = 0;
    let mut sink = |_: &[u8]| -> Result<(), BoxError> {
        count += 1;
        Ok(())
    };
    processor
        .process(&stream.name, &mut sink, ProcessOptions::default().max_lines(1))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(stored_offset(&path).as_deref(), Some("2"));

    let (_, lines) = stream.run(ProcessOptions::default());
    assert_eq!(lines, vec!["2"]);
}
