//! HTTP Archive (HAR) loading.
//!
//! Only the request half of each entry is read. Responses, timings, and any
//! other HAR sections are ignored during deserialization.

use crate::types::{WatchError, WatchResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Checkout page URL used when the caller does not supply its own match.
pub const CHECKOUT_URL: &str = "https://primenow.amazon.com/checkout/enter-checkout";

/// A `{name, value}` pair as HAR stores headers, cookies, and query params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub name: String,
    pub value: String,
}

impl Pair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A captured request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Pair>,
    #[serde(default)]
    pub cookies: Vec<Pair>,
    #[serde(rename = "queryString", default)]
    pub query_string: Vec<Pair>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// One archive entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub request: Request,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Log {
    entries: Vec<Entry>,
}

/// A parsed HTTP archive, entries in capture order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Archive {
    log: Log,
}

impl Archive {
    /// Parse an archive from raw JSON bytes.
    pub fn parse(bytes: &[u8]) -> WatchResult<Self> {
        let archive: Archive = serde_json::from_slice(bytes)?;
        tracing::debug!("Parsed archive with {} entries", archive.len());
        Ok(archive)
    }

    /// Read and parse an archive file.
    pub fn load(path: impl AsRef<Path>) -> WatchResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        tracing::info!("Loading archive {}", path.display());
        Self::parse(&bytes)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.log.entries
    }

    pub fn len(&self) -> usize {
        self.log.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.entries.is_empty()
    }

    /// Return the first request whose URL satisfies `matches`.
    pub fn find_request<F>(&self, matches: F) -> Option<&Request>
    where
        F: Fn(&str) -> bool,
    {
        self.log
            .entries
            .iter()
            .map(|e| &e.request)
            .find(|r| matches(&r.url))
    }
}

/// Parse archive bytes.
pub fn load_archive(bytes: &[u8]) -> WatchResult<Archive> {
    Archive::parse(bytes)
}

/// Find the first request whose URL contains `url_substring`.
pub fn find_checkout_request<'a>(
    archive: &'a Archive,
    url_substring: &str,
) -> WatchResult<&'a Request> {
    archive
        .find_request(|url| url.contains(url_substring))
        .ok_or_else(|| WatchError::RequestNotFound(url_substring.to_string()))
}
