//! Run-scoped logging setup
//!
//! The subscriber is installed with [`tracing::subscriber::set_default`], so
//! it lives exactly as long as the returned [`LoggingGuard`]. The binary runs
//! on a single-threaded runtime, which keeps every task under that default.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::subscriber::DefaultGuard;
use tracing::warn;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the run's subscriber installed until dropped
#[must_use = "logging stops when the guard is dropped"]
pub struct LoggingGuard {
    _default: DefaultGuard,
}

impl std::fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoggingGuard")
    }
}

/// Build the filter: `RUST_LOG` plus `podcast_fetcher=<level>`
pub fn build_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("podcast_fetcher={}", level).parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install console logging, plus file logging when configured
///
/// A log file that cannot be opened is reported through the console logger
/// and otherwise ignored.
pub fn init(level: &str, config: &LoggingConfig) -> LoggingGuard {
    let (file_layer, file_error) = if config.file_logging {
        match open_log_file(&config.log_file) {
            Ok(file) => (
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file)),
                ),
                None,
            ),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(build_filter(level))
        .with(fmt::layer().with_target(false))
        .with(file_layer);

    let guard = LoggingGuard {
        _default: tracing::subscriber::set_default(subscriber),
    };

    if let Some(e) = file_error {
        warn!("Could not open log file {}: {}", config.log_file.display(), e);
    }
    guard
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tracing::info;

    #[test]
    fn test_file_logging_writes_lines() {
        let dir = TempDir::new().unwrap();
        let log_file = dir.path().join("run.log");
        let config = LoggingConfig {
            level: "info".to_string(),
            file_logging: true,
            log_file: log_file.clone(),
        };

        {
            let _guard = init("info", &config);
            info!("hello from the test");
        }

        let text = std::fs::read_to_string(&log_file).unwrap();
        assert!(text.contains("hello from the test"));
    }

    #[test]
    fn test_unopenable_log_file_is_not_fatal() {
        let config = LoggingConfig {
            level: "info".to_string(),
            file_logging: true,
            log_file: PathBuf::from("/nonexistent-dir/for/sure/run.log"),
        };
        let _guard = init("debug", &config);
        info!("still logging");
    }
}
