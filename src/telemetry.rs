//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence; otherwise the `[logging].filter` directive
//! from the config applies. Output goes to stderr so that `gorag ask` can
//! stream the answer on stdout undisturbed, or is appended to
//! `[logging].file` when one is configured. A log file that cannot be
//! opened falls back to stderr with a warning.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Builds the `EnvFilter`, falling back to `fallback` when `RUST_LOG` is unset.
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Writer for log output. The guard is `Some` when writing to a file.
fn make_writer(file: Option<&Path>) -> (BoxMakeWriter, Option<WorkerGuard>) {
    if let Some(path) = file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => {
                let (writer, guard) = tracing_appender::non_blocking(f);
                return (BoxMakeWriter::new(writer), Some(guard));
            }
            Err(e) => {
                eprintln!(
                    "warning: cannot open log file {} ({}), logging to stderr",
                    path.display(),
                    e
                );
            }
        }
    }
    (BoxMakeWriter::new(std::io::stderr), None)
}

/// Install the global subscriber. Call once, at startup.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background log writer.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = make_writer(config.file.as_deref());
    let ansi = guard.is_none();
    let registry = tracing_subscriber::registry().with(env_filter(&config.filter));

    let result = match config.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
        _ => registry
            .with(fmt::layer().with_ansi(ansi).with_writer(writer))
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_fallback_filter_parses() {
        let filter = env_filter("gorag=debug,info");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gorag.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let (writer, guard) = make_writer(Some(&path));
        assert!(guard.is_some());
        writer.make_writer().write_all(b"later\n").unwrap();
        // Dropping the guard flushes the background writer.
        drop(guard);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }

    #[test]
    fn test_unopenable_log_file_falls_back_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("gorag.log");

        let (_writer, guard) = make_writer(Some(&path));
        assert!(guard.is_none());
        assert!(!path.exists());
    }
}
