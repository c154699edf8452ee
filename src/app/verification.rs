//! Completeness checks for local episode files
//!
//! A file left behind by an earlier run may be finished, half-written or
//! stale. The verifier looks for it under every recognized audio extension
//! and weighs the best evidence available, in order of strength: a strong
//! entity tag compared against content digests, the server's declared size,
//! then the size declared by the feed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::app::client::{PodcastClient, RemoteProbe};
use crate::app::coordinator::signals::ShutdownSignal;
use crate::app::hash::{digest_etag, ContentDigests};
use crate::app::retry::RetryPolicy;
use crate::constants::files::AUDIO_EXTENSIONS;
use crate::errors::{DownloadError, DownloadResult};

/// Verdict on a local file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// No file under any recognized extension
    Absent,
    /// File exists but holds no bytes
    Empty,
    /// Evidence shows the file matches the remote resource
    Complete,
    /// Evidence shows the file differs from the remote resource
    Incomplete,
    /// No evidence either way
    Unverifiable,
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadState::Absent => "absent",
            DownloadState::Empty => "empty",
            DownloadState::Complete => "complete",
            DownloadState::Incomplete => "incomplete",
            DownloadState::Unverifiable => "unverifiable",
        };
        f.write_str(name)
    }
}

/// An existing local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path found on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Outcome of a completeness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletenessReport {
    /// Verdict
    pub state: DownloadState,
    /// Whether the transfer can be skipped
    pub is_complete: bool,
    /// Size of the existing file (0 when absent)
    pub local_size: u64,
    /// The file that was found, which may differ from the target in extension
    pub existing_path: Option<PathBuf>,
    /// Human-readable explanation for logs
    pub message: String,
}

impl CompletenessReport {
    fn new(state: DownloadState, local: Option<&LocalFile>, message: String) -> Self {
        Self {
            state,
            is_complete: state == DownloadState::Complete,
            local_size: local.map(|l| l.size).unwrap_or(0),
            existing_path: local.map(|l| l.path.clone()),
            message,
        }
    }
}

/// Look for `target`'s stem under every recognized audio extension
///
/// The extension of `target` itself is ignored.
///
/// # Errors
///
/// Returns I/O errors other than "not found"
pub async fn find_existing(target: &Path) -> std::io::Result<Option<LocalFile>> {
    for ext in AUDIO_EXTENSIONS {
        let candidate = target.with_extension(ext);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => {
                debug!(
                    "Found existing file: {} ({} bytes)",
                    candidate.display(),
                    meta.len()
                );
                return Ok(Some(LocalFile {
                    path: candidate,
                    size: meta.len(),
                }));
            }
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Decide completeness from what is on disk and what the server said
///
/// # Arguments
///
/// * `local` - The existing file, if any
/// * `probe` - The HEAD probe result; `None` when the probe failed
/// * `feed_length` - Enclosure length declared by the feed
/// * `trust_unverifiable` - Treat a non-empty file as complete when a
///   successful probe offered no evidence
pub async fn assess(
    local: Option<&LocalFile>,
    probe: Option<&RemoteProbe>,
    feed_length: Option<u64>,
    trust_unverifiable: bool,
) -> CompletenessReport {
    use DownloadState::*;

    let Some(file) = local else {
        return CompletenessReport::new(Absent, None, "Downloading new file".to_string());
    };
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if file.size == 0 {
        return CompletenessReport::new(Empty, local, "Redownloading empty file".to_string());
    }

    let Some(probe) = probe else {
        return CompletenessReport::new(
            Unverifiable,
            local,
            format!(
                "Cannot verify completeness (network error): {} (local: {} bytes)",
                name, file.size
            ),
        );
    };

    if let Some(tag) = probe.etag.as_deref().and_then(digest_etag) {
        return match ContentDigests::of_file(&file.path).await {
            Ok(digests) if digests.matches_tag(&tag) => CompletenessReport::new(
                Complete,
                local,
                format!(
                    "Skipping complete file (hash match): {} ({} bytes)",
                    name, file.size
                ),
            ),
            Ok(_) => CompletenessReport::new(
                Incomplete,
                local,
                format!(
                    "Redownloading incomplete file (hash mismatch): {} (local: {} bytes)",
                    name, file.size
                ),
            ),
            Err(e) => CompletenessReport::new(
                Unverifiable,
                local,
                format!("Could not compute hash for {}: {}", name, e),
            ),
        };
    }

    let by_size = |expected: u64, source: &str| {
        if file.size == expected {
            CompletenessReport::new(
                Complete,
                local,
                format!(
                    "Skipping complete file ({} match): {} ({} bytes)",
                    source, name, file.size
                ),
            )
        } else {
            CompletenessReport::new(
                Incomplete,
                local,
                format!(
                    "Redownloading incomplete file ({} mismatch): {} (local: {} bytes, expected: {} bytes)",
                    source, name, file.size, expected
                ),
            )
        }
    };

    if let Some(expected) = probe.content_length.filter(|len| *len > 0) {
        return by_size(expected, "size");
    }
    if let Some(expected) = feed_length.filter(|len| *len > 0) {
        return by_size(expected, "RSS");
    }

    let mut report = CompletenessReport::new(
        Unverifiable,
        local,
        format!(
            "Cannot verify completeness: {} (local: {} bytes)",
            name, file.size
        ),
    );
    if trust_unverifiable {
        report.is_complete = true;
        report.message = format!(
            "Keeping unverifiable file: {} ({} bytes)",
            name, file.size
        );
    }
    report
}

/// Probes remote resources and checks local files against them
#[derive(Debug, Clone)]
pub struct CompletenessVerifier {
    client: Arc<PodcastClient>,
    retry: RetryPolicy,
    shutdown: ShutdownSignal,
    trust_unverifiable: bool,
}

impl CompletenessVerifier {
    /// Create a verifier
    pub fn new(
        client: Arc<PodcastClient>,
        retry: RetryPolicy,
        shutdown: ShutdownSignal,
        trust_unverifiable: bool,
    ) -> Self {
        Self {
            client,
            retry,
            shutdown,
            trust_unverifiable,
        }
    }

    /// HEAD probe under the retry policy
    ///
    /// # Errors
    ///
    /// Returns the final probe error, or `DownloadError::Cancelled`
    pub async fn probe(&self, url: &str) -> DownloadResult<RemoteProbe> {
        self.retry
            .execute("HEAD probe", &self.shutdown, || self.client.probe(url))
            .await
    }

    /// Check whether `target` (under any recognized extension) is complete
    ///
    /// A failed probe yields `Unverifiable` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Cancelled` on shutdown, or an I/O error if the
    /// target directory cannot be read.
    pub async fn check(
        &self,
        url: &str,
        target: &Path,
        feed_length: Option<u64>,
    ) -> DownloadResult<CompletenessReport> {
        let local = find_existing(target).await?;
        if local.as_ref().map_or(true, |l| l.size == 0) {
            return Ok(assess(local.as_ref(), None, feed_length, self.trust_unverifiable).await);
        }

        let probe = self.probe_or_log(url).await?;
        Ok(self.assess(local.as_ref(), probe.as_ref(), feed_length).await)
    }

    /// [`assess`] with this verifier's policy
    pub async fn assess(
        &self,
        local: Option<&LocalFile>,
        probe: Option<&RemoteProbe>,
        feed_length: Option<u64>,
    ) -> CompletenessReport {
        assess(local, probe, feed_length, self.trust_unverifiable).await
    }

    /// Probe, turning every failure except cancellation into `None`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Cancelled` on shutdown
    pub async fn probe_or_log(&self, url: &str) -> DownloadResult<Option<RemoteProbe>> {
        match self.probe(url).await {
            Ok(probe) => Ok(Some(probe)),
            Err(e) if e.is_cancelled() => Err(DownloadError::Cancelled),
            Err(e) => {
                debug!("Could not check source for {}: {}", url, e);
                Ok(None)
            }
        }
    }
}
