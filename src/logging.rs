use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter: configured level, transfer core override, quiet sqlx
///
/// sqlx logs every statement at INFO, which drowns the per-leg transfer lines.
pub fn filter_directives(config: &AppConfig) -> String {
    let transfer = config
        .transfer_log_level
        .as_deref()
        .unwrap_or(&config.log_level);
    format!(
        "{},ledger_transfer::transfer={},sqlx=warn",
        config.log_level, transfer
    )
}

fn file_appender(config: &AppConfig) -> RollingFileAppender {
    match config.rotation.as_str() {
        "hourly" => rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => rolling::daily(&config.log_dir, &config.log_file),
        _ => rolling::never(&config.log_dir, &config.log_file),
    }
}

/// Install the global subscriber; keep the guard alive for the process lifetime
///
/// `RUST_LOG` replaces [`filter_directives`] entirely when set.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // Structured fields (source_ref, stage, applied) land as JSON keys
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .with(fmt::layer().compact())
            .init();
    }

    guard
}
