//! Process-level runtime helpers shared by the Quill binaries.
//!
//! Only logging lives here for now: an `EnvFilter`-driven stdout layer plus an
//! optional daily rolling log file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

/// Filter the CLI uses when `RUST_LOG` is unset or unparsable.
pub const CLI_LOG_FILTER: &str = "info";

/// Builds the filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    filter_or_default(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), default)
}

fn filter_or_default(directives: Option<&str>, default: &str) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Installs the global subscriber for `service`.
///
/// With `log_dir` set, events are also written to `<log_dir>/<service>.log.<date>`
/// through a non-blocking writer; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_tracing(service: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log dir {}", dir.display()))?;
            let appender = rolling::daily(dir, format!("{service}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LOG_FILTER))
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(service, log_dir = ?log_dir, "tracing initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::{filter_or_default, init_tracing, CLI_LOG_FILTER};

    #[test]
    fn filter_falls_back_to_default() {
        assert_eq!(filter_or_default(None, CLI_LOG_FILTER).to_string(), "info");
        assert_eq!(filter_or_default(Some("debug"), CLI_LOG_FILTER).to_string(), "debug");
        assert_eq!(
            filter_or_default(Some("quill=notalevel"), CLI_LOG_FILTER).to_string(),
            "info"
        );
    }

    #[test]
    fn file_layer_writes_into_log_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logs = dir.path().join("logs");

        let guard = init_tracing("quill-test", Some(&logs)).expect("init tracing");
        tracing::warn!("hello from the runtime test");
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(&logs)
            .expect("read log dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(files.iter().any(|name| name.starts_with("quill-test.log")), "{files:?}");

        assert!(init_tracing("quill-test", None).is_err(), "global subscriber is set once");
    }
}
