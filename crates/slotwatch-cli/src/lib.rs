//! slotwatch command-line support: settings resolution and the terminal notifier.

pub mod config;
pub mod notifier;

pub use config::{resolve_har_path, resolve_interval, resolve_recipient, Settings, WatchSettings};
pub use notifier::LogNotifier;
