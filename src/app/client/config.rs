//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP client
//! shared by feed retrieval, landing page scraping, probing and transfers.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use crate::constants::{http, limits};
use crate::errors::DownloadResult;

/// Configuration for the HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Overall timeout for page, feed and transfer requests
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Timeout for HEAD probes
    pub probe_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            probe_timeout: http::PROBE_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client with the specified configuration
    ///
    /// The request timeout is not set on the client itself. Transfers of large
    /// episodes legitimately outlive it, so it bounds whole page, feed and
    /// probe requests, and for transfers the wait for the response headers
    /// and for each body chunk.
    pub fn build_http_client(&self) -> DownloadResult<Client> {
        let mut client_builder = Client::builder()
            .cookie_store(true)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(Policy::limited(http::MAX_REDIRECTS))
            .tcp_nodelay(self.tcp_nodelay);

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        Ok(client_builder.build()?)
    }
}
