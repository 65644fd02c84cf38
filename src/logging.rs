//! Structured logging setup.
//!
//! A `tracing-subscriber` init routine in the style of a runtime-configured
//! fmt layer driven by `RUST_LOG` (defaulting to `info`), with an optional
//! JSON formatter for production deployments and an optional non-blocking
//! file appender via `tracing-appender`.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the lifetime of the process when file
/// logging is enabled; dropping it flushes the non-blocking writer.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init_with_config(config: &LoggingConfig) -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log));

    let file_guard = config.log_dir.as_ref().map(|dir| {
        let file_appender = tracing_appender::rolling::daily(dir, "room-sync-core.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_writer(non_blocking)
            .with_ansi(false)
            .finish();
        if config.json {
            // JSON output always goes to stdout; file output stays plain text.
        }
        let _ = tracing::subscriber::set_global_default(subscriber);
        guard
    });

    if file_guard.is_none() {
        if config.json {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        } else {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(config.ansi)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }

    LoggingGuard {
        _file_guard: file_guard,
    }
}
