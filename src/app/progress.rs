//! Transfer progress reporting
//!
//! The downloader reports bytes through the [`ProgressReporter`] trait. Which
//! implementation is used is decided once at startup: an interactive terminal
//! gets a progress bar (see `cli::progress`), anything else gets periodic log
//! lines emitted every [`LOG_INTERVAL_BYTES`](crate::constants::progress::LOG_INTERVAL_BYTES).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::info;

use crate::constants::progress::LOG_INTERVAL_BYTES;

/// Receives byte-level progress for one transfer at a time
pub trait ProgressReporter: Send + Sync {
    /// A transfer is starting
    ///
    /// `total` is the full size when known, `resumed_from` the number of bytes
    /// already on disk.
    fn start(&self, label: &str, total: Option<u64>, resumed_from: u64);

    /// `bytes` more bytes were written
    fn advance(&self, bytes: u64);

    /// The transfer ended (successfully or not)
    fn finish(&self);
}

/// Discards all progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn start(&self, _label: &str, _total: Option<u64>, _resumed_from: u64) {}
    fn advance(&self, _bytes: u64) {}
    fn finish(&self) {}
}

/// Logs a line each time another threshold of bytes has been written
#[derive(Debug)]
pub struct LogReporter {
    interval: u64,
    label: Mutex<String>,
    total: AtomicU64,
    written: AtomicU64,
    next_report: AtomicU64,
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new(LOG_INTERVAL_BYTES)
    }
}

impl LogReporter {
    /// Create a reporter that logs every `interval` bytes
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            label: Mutex::new(String::new()),
            total: AtomicU64::new(0),
            written: AtomicU64::new(0),
            next_report: AtomicU64::new(interval.max(1)),
        }
    }

    /// Bytes seen since the current transfer started, including resumed bytes
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn label(&self) -> String {
        self.label
            .lock()
            .map(|label| label.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for LogReporter {
    fn start(&self, label: &str, total: Option<u64>, resumed_from: u64) {
        if let Ok(mut current) = self.label.lock() {
            *current = label.to_string();
        }
        self.total.store(total.unwrap_or(0), Ordering::Relaxed);
        self.written.store(resumed_from, Ordering::Relaxed);
        self.next_report
            .store(resumed_from + self.interval, Ordering::Relaxed);

        if resumed_from > 0 {
            info!("Resuming {} from {} bytes", label, resumed_from);
        }
    }

    fn advance(&self, bytes: u64) {
        let written = self.written.fetch_add(bytes, Ordering::Relaxed) + bytes;
        let next = self.next_report.load(Ordering::Relaxed);
        if written < next {
            return;
        }

        // Skip thresholds crossed by a single large chunk
        let passed = (written - next) / self.interval + 1;
        self.next_report
            .store(next + passed * self.interval, Ordering::Relaxed);

        let total = self.total.load(Ordering::Relaxed);
        let mib = written as f64 / (1024.0 * 1024.0);
        if total > 0 {
            info!(
                "{}: {:.1} MiB of {:.1} MiB ({:.0}%)",
                self.label(),
                mib,
                total as f64 / (1024.0 * 1024.0),
                written as f64 * 100.0 / total as f64
            );
        } else {
            info!("{}: {:.1} MiB", self.label(), mib);
        }
    }

    fn finish(&self) {
        tracing::debug!("{}: {} bytes total", self.label(), self.written());
    }
}
