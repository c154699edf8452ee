//! Core HTTP operations with rate limiting
//!
//! This module provides the fundamental request operations. Each call is a
//! single attempt; retries are layered on top by
//! [`RetryPolicy`](crate::app::retry::RetryPolicy) so that every caller gets
//! its own budget.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderName, CONTENT_LENGTH, CONTENT_TYPE, ETAG, RANGE};
use reqwest::{Client, Response};
use url::Url;

use crate::errors::{DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// What a HEAD request revealed about a remote resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteProbe {
    /// Declared `Content-Length`, when present and parseable
    pub content_length: Option<u64>,
    /// Raw `ETag` header value
    pub etag: Option<String>,
    /// Raw `Content-Type` header value
    pub content_type: Option<String>,
}

impl RemoteProbe {
    /// Read the probe fields from raw response headers
    ///
    /// `Response::content_length` reports the body size, which is zero for a
    /// HEAD response, so the header is parsed directly.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            content_length: text(CONTENT_LENGTH).and_then(|s| s.parse().ok()),
            etag: text(ETAG),
            content_type: text(CONTENT_TYPE),
        }
    }
}

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use for requests
    /// * `rate_limit_rps` - Requests per second rate limit
    /// * `request_timeout` - Timeout for page and feed requests
    /// * `probe_timeout` - Timeout for HEAD probes
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidConfig` if the rate limit is zero
    pub fn new(
        client: Client,
        rate_limit_rps: u32,
        request_timeout: Duration,
        probe_timeout: Duration,
    ) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            request_timeout,
            probe_timeout,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(rate_limit_rps: u32) -> DownloadResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| DownloadError::InvalidConfig {
            reason: "rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    async fn throttle(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
    }

    /// Fetches a URL and fails on any non-success status
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for transport failures and non-2xx statuses
    pub async fn get_response(&self, url: &Url) -> DownloadResult<Response> {
        self.throttle().await;

        let response = self
            .client
            .get(url.as_str())
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DownloadError::from_status(response.status(), url.as_str()));
        }

        tracing::debug!("Successfully fetched response: {}", url);
        Ok(response)
    }

    /// Fetches the body of a page or feed as text
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails or the body cannot be read
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        let response = self.get_response(url).await?;
        let text = response.text().await?;
        tracing::debug!("Successfully fetched page: {} ({} bytes)", url, text.len());
        Ok(text)
    }

    /// Issues a HEAD request, following redirects
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for transport failures and non-2xx statuses
    pub async fn probe(&self, url: &Url) -> DownloadResult<RemoteProbe> {
        self.throttle().await;

        let response = self
            .client
            .head(url.as_str())
            .timeout(self.probe_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DownloadError::from_status(response.status(), url.as_str()));
        }

        let probe = RemoteProbe::from_headers(response.headers());
        tracing::debug!("Probe {}: {:?}", url, probe);
        Ok(probe)
    }

    /// Starts a transfer, asking for the bytes from `offset` onwards
    ///
    /// The status is not checked here; the caller decides what 200, 206 and
    /// 416 mean for the file on disk. The request timeout bounds the wait for
    /// the response headers only; body reads are bounded by the caller.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Timeout` if no response arrives in time, or
    /// `DownloadError::Http` if the request cannot be sent
    pub async fn get_from_offset(&self, url: &Url, offset: u64) -> DownloadResult<Response> {
        self.throttle().await;

        let mut request = self.client.get(url.as_str());
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }

        match tokio::time::timeout(self.request_timeout, request.send()).await {
            Ok(response) => Ok(response?),
            Err(_) => Err(DownloadError::Timeout {
                url: url.to_string(),
                timeout: self.request_timeout,
            }),
        }
    }

    /// Longest wait for a response or for the next chunk of a body
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}
