//! Logging and tracing configuration
//!
//! The CLI logs to stderr; `--log-dir` adds a file layer so scenario runs
//! leave a harness trace next to the node's own log.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// File name of the harness trace inside a log directory
pub const HARNESS_LOG: &str = "harness.log";

fn default_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(default_filter("chain_harness=info,warn"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing with stderr plus a file layer in `log_dir`
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the program.
pub fn init_with_file(log_dir: &Path) -> std::io::Result<(WorkerGuard, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::never(log_dir, HARNESS_LOG);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // File logging with full details, debug by default so wire traffic is kept
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .compact();

    tracing_subscriber::registry()
        .with(default_filter("chain_harness=debug,info"))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok((guard, log_dir.join(HARNESS_LOG)))
}

/// Install a test subscriber; repeated calls are harmless
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(default_filter("chain_harness=debug,warn"))
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}
