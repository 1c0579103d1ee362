//! Turn a captured archive request into a replayable GET.
//!
//! Cookies recorded in the archive's `cookies` list are not carried over.
//! Browsers also record the `cookie` request header itself, and that one is
//! replayed like any other header.

use crate::archive::Request;
use crate::types::{WatchError, WatchResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING};
use url::Url;

/// A replayable GET request derived from an archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    url: Url,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl OutboundRequest {
    /// Always `GET`.
    pub fn method(&self) -> reqwest::Method {
        reqwest::Method::GET
    }

    /// The URL exactly as captured.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// URL to put on the wire.
    ///
    /// A non-empty captured query list replaces the URL's own query string so
    /// parameters are not sent twice.
    pub fn target_url(&self) -> Url {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let mut url = self.url.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        url
    }

    /// Captured headers as a wire header map, duplicates kept in order.
    ///
    /// HTTP/2 pseudo-headers (`:authority`, `:path`, ...) and anything that is
    /// not a legal header name or value are skipped. `Accept-Encoding` is left
    /// to the HTTP client, which only advertises encodings it can decode.
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if name.starts_with(':') {
                tracing::debug!("Skipping pseudo-header {name}");
                continue;
            }
            if name.eq_ignore_ascii_case(ACCEPT_ENCODING.as_str()) {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => {
                    map.append(n, v);
                }
                _ => tracing::warn!("Skipping header '{name}': not a valid HTTP header"),
            }
        }
        map
    }
}

/// Build a replayable request from a captured one.
pub fn build_request(entry: &Request) -> WatchResult<OutboundRequest> {
    let url = Url::parse(&entry.url)
        .map_err(|e| WatchError::RequestBuild(format!("invalid URL '{}': {e}", entry.url)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(WatchError::RequestBuild(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            entry.url
        )));
    }

    let headers = entry
        .headers
        .iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect();
    let query = entry
        .query_string
        .iter()
        .map(|q| (q.name.clone(), q.value.clone()))
        .collect();

    if !entry.cookies.is_empty() {
        tracing::debug!(
            "Dropping {} archived cookie(s) from {}",
            entry.cookies.len(),
            url
        );
    }

    Ok(OutboundRequest {
        url,
        headers,
        query,
    })
}
