//! Async HTTP client wrapping reqwest.
//!
//! Replays an [`OutboundRequest`] and hands back the decoded body. gzip,
//! deflate, and brotli response bodies are decompressed by reqwest before
//! they reach the caller.

use crate::request::OutboundRequest;
use crate::types::{WatchError, WatchResult};
use std::time::Duration;

/// Fallback user agent, used only when the captured request carries none.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Response from a replayed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Decompressed body bytes.
    pub body: Vec<u8>,
}

/// HTTP client for replaying checkout requests.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> WatchResult<Self> {
        Self::with_user_agent(timeout, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> WatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
            .map_err(|e| WatchError::Transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Send the request once.
    ///
    /// Connection failures, timeouts, body read failures, and non-2xx statuses
    /// all come back as [`WatchError::Transport`].
    pub async fn fetch(&self, request: &OutboundRequest) -> WatchResult<HttpResponse> {
        let resp = self
            .client
            .request(request.method(), request.target_url())
            .headers(request.header_map())
            .send()
            .await?;

        let status = resp.status();
        let final_url = resp.url().to_string();

        if !status.is_success() {
            return Err(WatchError::Transport(format!(
                "{} returned HTTP {}",
                final_url,
                status.as_u16()
            )));
        }

        let body = resp.bytes().await?.to_vec();
        tracing::debug!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(HttpResponse {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}
