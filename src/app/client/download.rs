//! Resumable file transfers
//!
//! A transfer appends to whatever is already on disk. The server's answer to
//! the range request decides what happens to the existing bytes: `206` keeps
//! them, `200` replaces them, `416` means there is nothing left to fetch.
//! Partial files are never deleted, so an interrupted or failed transfer can
//! be resumed by the next attempt or the next run.

use std::path::Path;

use futures::StreamExt;
use reqwest::StatusCode;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::app::coordinator::signals::ShutdownSignal;
use crate::app::progress::ProgressReporter;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Result of one successful transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The server reported that the local file already holds every byte
    AlreadyComplete,
    /// Bytes were written
    Completed {
        /// Bytes written by this attempt
        bytes_written: u64,
        /// Bytes kept from an earlier partial file
        resumed_from: u64,
    },
}

impl TransferOutcome {
    /// Size of the file on disk after the transfer, if bytes were written
    pub fn final_size(&self) -> Option<u64> {
        match self {
            TransferOutcome::AlreadyComplete => None,
            TransferOutcome::Completed {
                bytes_written,
                resumed_from,
            } => Some(bytes_written + resumed_from),
        }
    }
}

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Performs one resumable transfer attempt
    ///
    /// # Arguments
    ///
    /// * `url` - The audio URL
    /// * `destination` - Target file; existing bytes are resumed from
    /// * `reporter` - Receives byte progress
    /// * `shutdown` - Checked on every chunk
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The request fails or the server answers with an unexpected status
    /// - The body stream breaks (the partial file is kept)
    /// - File I/O operations fail
    /// - Shutdown was requested (`DownloadError::Cancelled`)
    pub async fn download_resumable(
        &self,
        url: &Url,
        destination: &Path,
        reporter: &dyn ProgressReporter,
        shutdown: &ShutdownSignal,
    ) -> DownloadResult<TransferOutcome> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let existing = match tokio::fs::metadata(destination).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        let response = self.http_handler.get_from_offset(url, existing).await?;
        let status = response.status();

        let (file, resumed_from) = match status {
            StatusCode::RANGE_NOT_SATISFIABLE if existing > 0 => {
                info!(
                    "Server reports {} already complete ({} bytes)",
                    destination.display(),
                    existing
                );
                return Ok(TransferOutcome::AlreadyComplete);
            }
            StatusCode::PARTIAL_CONTENT => {
                debug!("Resuming {} from byte {}", destination.display(), existing);
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(destination)
                    .await?;
                (file, existing)
            }
            StatusCode::OK => {
                if existing > 0 {
                    debug!(
                        "Server ignored range request; rewriting {}",
                        destination.display()
                    );
                }
                (File::create(destination).await?, 0)
            }
            other => return Err(DownloadError::from_status(other, url.as_str())),
        };

        let total = response.content_length().map(|len| len + resumed_from);
        let label = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        reporter.start(&label, total, resumed_from);

        let mut writer = BufWriter::with_capacity(files::DOWNLOAD_CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut bytes_written = 0u64;
        let read_timeout = self.http_handler.request_timeout();

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.triggered() => break Err(DownloadError::Cancelled),
                chunk = tokio::time::timeout(read_timeout, stream.next()) => chunk,
            };

            // A stalled body counts as a transient failure; the bytes written
            // so far stay on disk for the retry to resume from
            let Ok(next) = next else {
                break Err(DownloadError::Timeout {
                    url: url.to_string(),
                    timeout: read_timeout,
                });
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Err(e) = writer.write_all(&chunk).await {
                        break Err(e.into());
                    }
                    bytes_written += chunk.len() as u64;
                    reporter.advance(chunk.len() as u64);
                }
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            }
        };

        // Keep whatever arrived, even on failure, so the next attempt resumes
        let flushed = writer.flush().await;
        reporter.finish();
        result?;
        flushed?;

        Ok(TransferOutcome::Completed {
            bytes_written,
            resumed_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::app::client::config::ClientConfig;
    use crate::app::progress::{LogReporter, NoopReporter};

    fn create_test_handler() -> HttpHandler {
        handler_with_timeout(Duration::from_secs(5))
    }

    fn handler_with_timeout(request_timeout: Duration) -> HttpHandler {
        let config = ClientConfig::default();
        let client = config.build_http_client().unwrap();
        HttpHandler::new(client, 50, request_timeout, Duration::from_secs(5)).unwrap()
    }

    fn audio_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/epi/prov_1/epi_2_medium.m4a", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/epi/prov_1/epi_2_medium.m4a"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"full episode".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("series").join("ep_1.m4a");
        let http = create_test_handler();
        let reporter = LogReporter::new(4);

        let outcome = DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &reporter, &ShutdownSignal::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Completed {
                bytes_written: 12,
                resumed_from: 0
            }
        );
        assert_eq!(outcome.final_size(), Some(12));
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"full episode");
        assert_eq!(reporter.written(), 12);
    }

    #[tokio::test]
    async fn test_partial_content_is_appended() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Range", "bytes=5-"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(b"episode".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("ep.m4a");
        tokio::fs::write(&target, b"full ").await.unwrap();

        let http = create_test_handler();
        let outcome = DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &NoopReporter, &ShutdownSignal::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransferOutcome::Completed {
                bytes_written: 7,
                resumed_from: 5
            }
        );
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"full episode");
    }

    #[tokio::test]
    async fn test_ignored_range_rewrites_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new body".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("ep.m4a");
        tokio::fs::write(&target, b"stale bytes that are longer")
            .await
            .unwrap();

        let http = create_test_handler();
        DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &NoopReporter, &ShutdownSignal::new())
            .await
            .unwrap();

        // The full body replaces the stale prefix rather than being appended
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"new body");
    }

    #[tokio::test]
    async fn test_range_not_satisfiable_leaves_file_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Range", "bytes=12-"))
            .respond_with(ResponseTemplate::new(416))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("ep.m4a");
        tokio::fs::write(&target, b"full episode").await.unwrap();

        let http = create_test_handler();
        let outcome = DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &NoopReporter, &ShutdownSignal::new())
            .await
            .unwrap();

        assert_eq!(outcome, TransferOutcome::AlreadyComplete);
        assert_eq!(outcome.final_size(), None);
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"full episode");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("ep.m4a");

        let http = create_test_handler();
        let err = DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &NoopReporter, &ShutdownSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::ServerError { status: 500 }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_cancelled_transfer_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow body".to_vec())
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("ep.m4a");
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let http = create_test_handler();
        let err = DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &NoopReporter, &shutdown)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_stalled_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late body".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("ep.m4a");

        let http = handler_with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = DownloadHandler::new(&http)
            .download_resumable(&audio_url(&server), &target, &NoopReporter, &ShutdownSignal::new())
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(err, DownloadError::Timeout { .. }));
        assert!(err.is_transient());
    }
}
