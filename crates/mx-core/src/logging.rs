//! Logging initialization using the `tracing` ecosystem.
//!
//! - Console output (colored, human-readable)
//! - File output (daily rotation via `tracing-appender`, non-blocking writer)
//! - Level from `RUST_LOG` if set, else the explicit parameter

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Call once at program start. When `log_dir` is given the returned guard
/// flushes the file writer on drop and must be kept alive until exit.
///
/// # Parameters
///
/// - `log_level`: default filter if `RUST_LOG` is not set (e.g. `"info"`)
/// - `log_dir`: optional directory for daily-rotating log files
/// - `module_name`: log file prefix (e.g. `"mx-runner"`)
pub fn init_logging(
    log_level: &str,
    log_dir: Option<&str>,
    module_name: &str,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer().with_target(true).with_thread_ids(true).with_ansi(true);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(env_filter).with(console_layer).try_init()?;
        return Ok(None);
    };

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, module_name));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(Some(guard))
}
