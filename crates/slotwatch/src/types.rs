//! Core data types shared by the archive, scraper, and polling layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A delivery slot label as offered on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryWindow(pub String);

impl DeliveryWindow {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeliveryWindow {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

/// Outcome of one successful fetch-and-scrape cycle.
///
/// An empty `windows` list means the page loaded but offered nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub windows: Vec<DeliveryWindow>,
    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(windows: Vec<DeliveryWindow>) -> Self {
        Self {
            windows,
            checked_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }
}

/// Errors that can occur while preparing or running a watch.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("Archive parse error: {0}")]
    ArchiveParse(#[from] serde_json::Error),

    #[error("Request not found: no archive entry URL contains '{0}'")]
    RequestNotFound(String),

    #[error("Request build error: {0}")]
    RequestBuild(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Page parse error: {0}")]
    PageParse(String),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Whether a polling session can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WatchError::Transport(_) | WatchError::Notifier(_))
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(e: reqwest::Error) -> Self {
        WatchError::Transport(e.to_string())
    }
}

/// Convenience result type.
pub type WatchResult<T> = Result<T, WatchError>;
