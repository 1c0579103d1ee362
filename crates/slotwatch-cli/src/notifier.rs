//! Notifier that writes messages to the terminal instead of a messaging service.

use async_trait::async_trait;
use slotwatch::{Notifier, WatchResult};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, recipient: &str, body: &str) -> WatchResult<()> {
        tracing::info!(recipient, "notification: {body}");
        println!(">> {recipient}: {body}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_ok, block_on};

    #[test]
    fn test_log_notifier_never_fails() {
        let notifier = LogNotifier::new();
        assert_ok!(block_on(
            notifier.send_message("+15005550006", "There is 1 delivery window available")
        ));
    }
}
