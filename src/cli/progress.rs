//! Terminal progress display
//!
//! [`BarReporter`] draws one indicatif bar per transfer. [`select_reporter`]
//! picks it when stderr is an interactive terminal and falls back to the
//! byte-threshold [`LogReporter`] otherwise.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::progress::{LogReporter, NoopReporter, ProgressReporter};

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} {bytes} ({bytes_per_sec})";

/// Progress bar for interactive terminals
#[derive(Debug, Default)]
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    /// Create a reporter with no bar showing
    pub fn new() -> Self {
        Self::default()
    }

    fn style(total: Option<u64>) -> ProgressStyle {
        match total {
            Some(_) => ProgressStyle::with_template(BAR_TEMPLATE)
                .map(|style| style.progress_chars("##-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            None => ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        }
    }
}

impl ProgressReporter for BarReporter {
    fn start(&self, label: &str, total: Option<u64>, resumed_from: u64) {
        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        bar.set_style(Self::style(total));
        bar.set_message(label.to_string());
        bar.set_position(resumed_from);
        bar.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn advance(&self, bytes: u64) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(bytes);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }
}

/// Pick the reporter for this run
///
/// Quiet runs get no progress at all.
pub fn select_reporter(quiet: bool) -> Arc<dyn ProgressReporter> {
    if quiet {
        Arc::new(NoopReporter)
    } else if atty::is(atty::Stream::Stderr) {
        Arc::new(BarReporter::new())
    } else {
        Arc::new(LogReporter::default())
    }
}
