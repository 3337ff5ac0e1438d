//! Structured Logger
//!
//! Console output for interactive use; when a log directory is configured,
//! a daily-rolling NDJSON file (`pagelens.log.YYYY-MM-DD`) is written too.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global structured logger.
///
/// `level` is the fallback filter when `RUST_LOG` is unset. Calling this more
/// than once is a no-op (the second `try_init` is ignored), which keeps tests
/// that share a process safe.
pub fn init_logger<P: AsRef<Path>>(log_dir: Option<P>, level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    match log_dir {
        Some(dir) => {
            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, dir, "pagelens.log");
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_ansi(false);

            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .try_init();
        }
    }
}
