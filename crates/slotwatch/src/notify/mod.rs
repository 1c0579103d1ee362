//! Outbound notifications.
//!
//! The transport is supplied by the caller through [`Notifier`]; this crate
//! only decides when to send and what to say.

pub mod throttle;

pub use throttle::{Notification, ThrottleState, DEFAULT_QUOTA};

use crate::types::WatchResult;
use async_trait::async_trait;

/// Something that can deliver a text message to a recipient.
///
/// Credentials and endpoints belong to the implementation and are given to
/// it at construction. Failures should be returned as
/// [`WatchError::Notifier`](crate::types::WatchError::Notifier).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, recipient: &str, body: &str) -> WatchResult<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn send_message(&self, recipient: &str, body: &str) -> WatchResult<()> {
        (**self).send_message(recipient, body).await
    }
}
