//! Configuration loading and resolution.
//!
//! Every setting resolves in the same order: command-line flag, then
//! environment variable, then built-in default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use slotwatch::{PollerConfig, DEFAULT_QUOTA};

pub const HAR_ENV: &str = "SLOTWATCH_HAR";
pub const RECIPIENT_ENV: &str = "SLOTWATCH_RECIPIENT";
pub const INTERVAL_ENV: &str = "SLOTWATCH_INTERVAL_SECS";

/// Archive file looked for in the working directory.
pub const DEFAULT_HAR_PATH: &str = "checkout.har";

/// Resolve the archive path.
pub fn resolve_har_path(explicit: Option<&str>) -> PathBuf {
    first_of(explicit, std::env::var(HAR_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HAR_PATH))
}

/// Resolve the notification recipient, if one was given anywhere.
pub fn resolve_recipient(explicit: Option<&str>) -> Option<String> {
    first_of(explicit, std::env::var(RECIPIENT_ENV).ok())
}

/// Resolve the polling interval.
pub fn resolve_interval(explicit: Option<u64>) -> anyhow::Result<Duration> {
    if let Some(secs) = explicit {
        return Ok(Duration::from_secs(secs));
    }
    match std::env::var(INTERVAL_ENV) {
        Ok(raw) => parse_interval(&raw).with_context(|| format!("invalid {INTERVAL_ENV}")),
        Err(_) => Ok(slotwatch::poller::DEFAULT_INTERVAL),
    }
}

fn first_of(explicit: Option<&str>, from_env: Option<String>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or(from_env)
        .filter(|v| !v.trim().is_empty())
}

fn parse_interval(raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("expected whole seconds, got {raw:?}"))?;
    Ok(Duration::from_secs(secs))
}

/// Settings shared by every command that touches the network.
#[derive(Debug, Clone)]
pub struct Settings {
    pub har_path: PathBuf,
    pub url_match: String,
    pub timeout: Duration,
    pub dump_html: Option<PathBuf>,
}

impl Settings {
    pub fn poller_config(&self, interval: Duration) -> PollerConfig {
        PollerConfig {
            interval,
            timeout: self.timeout,
            dump_html: self.dump_html.clone(),
            ..PollerConfig::default()
        }
    }
}

/// Settings for a long-running watch.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub recipient: String,
    pub interval: Duration,
    pub quota: u32,
}

impl WatchSettings {
    pub fn resolve(
        to: Option<&str>,
        interval_secs: Option<u64>,
        quota: Option<u32>,
    ) -> anyhow::Result<Self> {
        let recipient = resolve_recipient(to)
            .with_context(|| format!("no recipient: pass --to or set {RECIPIENT_ENV}"))?;
        Ok(Self {
            recipient,
            interval: resolve_interval(interval_secs)?,
            quota: quota.unwrap_or(DEFAULT_QUOTA),
        })
    }
}
