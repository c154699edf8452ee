//! Run statistics and session results
//!
//! Counters are plain fields: the pipeline handles one episode at a time, so
//! nothing here is shared between tasks.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How one episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Bytes were transferred
    Downloaded {
        /// Bytes written in this run
        bytes_written: u64,
        /// Bytes that were already on disk
        resumed_from: u64,
    },
    /// The server reported nothing left to send
    AlreadyComplete,
    /// Verified complete, no transfer attempted
    Skipped,
}

/// Whether the run reached the end of its episode list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every episode was attempted
    Completed,
    /// Shutdown was requested before the end
    Interrupted,
}

/// Counters for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Episodes in the download plan
    pub total: usize,
    /// Episodes transferred (fully or by resuming)
    pub downloaded: usize,
    /// Episodes the server reported as already complete
    pub already_complete: usize,
    /// Episodes skipped after verification
    pub skipped: usize,
    /// Episodes whose transfer failed
    pub failed: usize,
    /// Feed items without a resolvable audio URL
    pub unresolved: usize,
    /// Items resolved from the feed alone
    pub feed_fallbacks: usize,
    /// Items served from the episode cache
    pub cached: usize,
    /// Bytes written in this run
    pub bytes_downloaded: u64,
    /// Start of the session
    pub session_start: DateTime<Utc>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            total: 0,
            downloaded: 0,
            already_complete: 0,
            skipped: 0,
            failed: 0,
            unresolved: 0,
            feed_fallbacks: 0,
            cached: 0,
            bytes_downloaded: 0,
            session_start: Utc::now(),
        }
    }
}

impl SessionStats {
    /// Episodes that are on disk and complete after this run
    pub fn succeeded(&self) -> usize {
        self.downloaded + self.already_complete + self.skipped
    }

    /// Episodes processed so far, whatever the result
    pub fn processed(&self) -> usize {
        self.succeeded() + self.failed
    }

    /// Record the outcome of one episode
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Downloaded { bytes_written, .. } => {
                self.downloaded += 1;
                self.bytes_downloaded += bytes_written;
            }
            ItemOutcome::AlreadyComplete => self.already_complete += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Record a failed episode
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Success ratio in percent
    pub fn success_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.succeeded() as f64 / self.total as f64) * 100.0
    }
}

/// Final result of a download session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    /// Final counters
    pub stats: SessionStats,
    /// Whether the run finished or was interrupted
    pub outcome: RunOutcome,
    /// Directory holding the episodes (and any partial files)
    pub series_dir: PathBuf,
    /// Ids of the episodes that ended complete on disk, in processing order
    #[serde(default)]
    pub completed: Vec<String>,
    /// Wall time of the download phase
    pub total_duration: Duration,
}

impl SessionResult {
    /// Whether the run finished without failures
    pub fn is_clean(&self) -> bool {
        self.outcome == RunOutcome::Completed && self.stats.failed == 0
    }

    /// One-line summary
    pub fn headline(&self) -> String {
        format!(
            "Successfully downloaded {}/{} episodes",
            self.stats.succeeded(),
            self.stats.total
        )
    }
}
