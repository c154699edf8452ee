//! HTTP client for iono.fm feeds, landing pages and audio hosts
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Core HTTP operations with rate limiting
//! - `download`: Resumable streaming transfers
//!
//! Every method performs a single attempt. Callers wrap them in a
//! [`RetryPolicy`](crate::app::retry::RetryPolicy) so each operation gets its
//! own attempt budget.

use std::path::Path;

use url::Url;

use crate::app::coordinator::signals::ShutdownSignal;
use crate::app::progress::ProgressReporter;
use crate::errors::{DownloadError, DownloadResult};

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use download::TransferOutcome;
pub use http::RemoteProbe;

use download::DownloadHandler;
use http::HttpHandler;

/// Rate-limited HTTP client shared by every pipeline stage
#[derive(Debug)]
pub struct PodcastClient {
    http_handler: HttpHandler,
}

impl PodcastClient {
    /// Creates a client with default settings
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if HTTP client creation fails
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration settings
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if HTTP client creation fails or the rate limit
    /// is zero
    pub fn with_config(config: &ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(
            client,
            config.rate_limit_rps,
            config.request_timeout,
            config.probe_timeout,
        )?;

        tracing::debug!(
            "Created HTTP client ({} req/s, timeout {:?})",
            config.rate_limit_rps,
            config.request_timeout
        );

        Ok(Self { http_handler })
    }

    /// Fetches a page or feed body as text
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid or the request fails
    pub async fn get_page(&self, url: &str) -> DownloadResult<String> {
        self.http_handler.get_page(&parse_url(url)?).await
    }

    /// Issues a HEAD probe for completeness checks and format detection
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid or the request fails
    pub async fn probe(&self, url: &str) -> DownloadResult<RemoteProbe> {
        self.http_handler.probe(&parse_url(url)?).await
    }

    /// Performs one resumable transfer attempt into `destination`
    ///
    /// # Errors
    ///
    /// See [`DownloadHandler::download_resumable`]
    pub async fn download_resumable(
        &self,
        url: &str,
        destination: &Path,
        reporter: &dyn ProgressReporter,
        shutdown: &ShutdownSignal,
    ) -> DownloadResult<TransferOutcome> {
        let url = parse_url(url)?;
        DownloadHandler::new(&self.http_handler)
            .download_resumable(&url, destination, reporter, shutdown)
            .await
    }
}

/// Parse a URL, mapping failures to `DownloadError::InvalidUrl`
pub fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}
