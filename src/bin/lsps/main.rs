// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::metadata::LevelFilter;
use tracing::{error, info};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use lsps::init::args::{RemoteArgs, StreamArgs};
use lsps::remote::{RemoteConfig, RemoteStreamBridge, RemoteTarget};
use lsps::stream::{
    BoxError, Error, StdoutSink, StreamName, StreamProcessor, StreamWriters, sink,
};

#[derive(Debug, Parser)]
#[command(name = "lsps")]
#[command(bin_name = "lsps")]
#[command(
    version,
    about = "Log Stream Process Services, print local log streams to stdout for the next pipeline stage.",
    long_about = None
)]
struct Arguments {
    /// Log stream names to be processed
    #[arg(value_name = "NAME", required = true)]
    names: Vec<StreamName>,

    /// Write synthetic test events to the named streams instead of processing them
    #[arg(long, default_value = "false")]
    debug: bool,

    /// Delay between synthetic test events
    #[arg(long, env = "LSPS_DEBUG_INTERVAL_MS", default_value = "1000")]
    debug_interval_ms: u64,

    /// Stop after this many synthetic test events (runs forever when unset)
    #[arg(long, env = "LSPS_DEBUG_EVENTS")]
    debug_events: Option<u64>,

    #[arg(value_enum, long, env = "LSPS_LOG_FORMAT", default_value = "text")]
    /// Log format
    log_format: LogFormatArg,

    /// Default log level, RUST_LOG takes precedence
    #[arg(long, env = "LSPS_LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,

    #[command(flatten)]
    stream: StreamArgs,

    #[command(flatten)]
    remote: RemoteArgs,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

fn main() -> ExitCode {
    let opt = Arguments::parse();

    let _guard = match setup_logging(&opt.log_format, opt.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: failed to setup logging: {}", e);
            return ExitCode::from(1);
        }
    };

    let result = if opt.debug {
        emit_test_events(&opt)
    } else if let Some((config, target)) = opt.remote.build_config() {
        pull_remote(&opt.names, &config, &target)
    } else {
        process_local(&opt)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Failed to process log streams.");
            ExitCode::from(1)
        }
    }
}

fn process_local(opt: &Arguments) -> Result<(), BoxError> {
    let processor = StreamProcessor::new(&opt.stream.build_config())?;
    let opts = opt.stream.process_options();
    let mut sink = StdoutSink::new();

    let mut failed = 0;
    for name in &opt.names {
        match processor.process(name, &mut sink, opts) {
            Ok(summary) => info!(
                stream = %name,
                delivered = summary.delivered,
                failed = summary.failed,
                files_deleted = summary.files_deleted,
                "Processed stream."
            ),
            Err(e) => {
                error!(stream = %name, error = %e, "Failed to process stream.");
                failed += 1;
                if let Error::Sink { source, .. } = &e
                    && sink::is_terminal(source)
                {
                    error!("Standard output closed, skipping remaining streams.");
                    break;
                }
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} streams failed", failed, opt.names.len()).into());
    }
    Ok(())
}

fn pull_remote(
    names: &[StreamName],
    config: &RemoteConfig,
    target: &RemoteTarget,
) -> Result<(), BoxError> {
    let bridge = RemoteStreamBridge::new(config)?;
    let mut sink = StdoutSink::new();
    for name in names {
        let summary = bridge.process_remote(name, &mut sink, target);
        info!(
            stream = %name,
            target = %target,
            delivered = summary.delivered,
            succeeded = summary.succeeded,
            "Pulled remote stream."
        );
    }
    Ok(())
}

fn emit_test_events(opt: &Arguments) -> Result<(), BoxError> {
    let mut writers = StreamWriters::new(opt.stream.base_dir.clone());
    let interval = Duration::from_millis(opt.debug_interval_ms);
    let pid = std::process::id();
    info!(base_dir = ?writers.base_dir(), "Writing test events.");

    let mut i: u64 = 0;
    loop {
        for name in &opt.names {
            if opt.debug_events.is_some_and(|limit| i >= limit) {
                return Ok(());
            }
            let ts = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            let event = serde_json::json!({"i": i, "type_": "test", "pid": pid, "ts": ts});
            writers.append(name, &event.to_string())?;
            thread::sleep(interval);
            i += 1;
        }
    }
}

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

// Stdout carries delivered lines, so diagnostics go to stderr
fn setup_logging(log_format: &LogFormatArg, level: LevelFilter) -> Result<LoggerGuard, BoxError> {
    LogTracer::init()?;

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()?;

    if *log_format == LogFormatArg::Json {
        let app_name = format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking_writer);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(bunyan_formatting_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        use std::io;
        use std::io::IsTerminal;

        // Skip color codes when not in a terminal
        let use_ansi = io::stderr().is_terminal();

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_target(false)
            .with_level(true)
            .with_ansi(use_ansi)
            .compact();

        let subscriber = Registry::default().with(filter).with(stderr_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(guard)
}
