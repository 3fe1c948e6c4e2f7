// Logging module - tracing subscriber setup
//
// Console output goes to stderr so stdout stays clean for the sync report
// (and for `--json`). File logging is optional: JSON lines through a
// non-blocking rotating appender.
//
// Precedence: RUST_LOG env var > config file > default "info"

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogRotation, LoggingConfig};

/// Default directive when RUST_LOG is unset
pub fn default_directive(config: &LoggingConfig) -> String {
    format!("darci_sync={},reqwest=warn", config.level)
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(config).into())
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(config);
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if !config.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.file_dir) {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        tracing::warn!(
            dir = %config.file_dir.display(),
            error = %e,
            "failed to create log directory, file logging disabled"
        );
        return None;
    }

    let file_appender = RollingFileAppender::new(
        rotation(config.file_rotation),
        &config.file_dir,
        &config.file_prefix,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    Some(guard)
}
