//! Watch session: one polling run plus its notification counters.
//!
//! The session exclusively owns the request, the running poll handle, and the
//! throttle counters. Counters advance only in [`PollSession::next_result`]
//! and are cleared whenever a run ends, so every run starts with a full quota.

use crate::notify::{Notifier, ThrottleState};
use crate::poller::{CancelHandle, PollHandle, PollState, Poller};
use crate::request::OutboundRequest;
use crate::types::{CheckResult, WatchResult};

pub struct PollSession<N: Notifier> {
    poller: Poller,
    request: OutboundRequest,
    recipient: String,
    notifier: N,
    throttle: ThrottleState,
    handle: Option<PollHandle>,
}

impl<N: Notifier> PollSession<N> {
    pub fn new(
        poller: Poller,
        request: OutboundRequest,
        recipient: impl Into<String>,
        notifier: N,
        throttle: ThrottleState,
    ) -> Self {
        Self {
            poller,
            request,
            recipient: recipient.into(),
            notifier,
            throttle,
            handle: None,
        }
    }

    /// Begin polling. Does nothing if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        tracing::info!("Starting watch for {}", self.recipient);
        self.handle = Some(self.poller.start(self.request.clone()));
    }

    /// Stop the current run, clear the counters, and start again.
    pub async fn restart(&mut self) {
        self.stop().await;
        self.start();
    }

    /// Cancel the current run, wait for it to wind down, and clear the counters.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop().await;
            self.finish_run();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.state() != PollState::Cancelled)
    }

    /// Trigger for the current run, e.g. for a Ctrl-C handler.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.handle.as_ref().map(PollHandle::cancel_handle)
    }

    pub fn throttle(&self) -> ThrottleState {
        self.throttle
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Wait for the next poll result and send any notification it earns.
    ///
    /// Returns `None` once the run has ended (cancelled, or not started).
    /// A fatal error is returned once, after which the run is over.
    pub async fn next_result(&mut self) -> Option<WatchResult<CheckResult>> {
        let next = match self.handle.as_mut() {
            Some(handle) => handle.results().next().await,
            None => return None,
        };
        let item = match next {
            Some(item) => item,
            None => {
                self.finish_run();
                return None;
            }
        };

        match &item {
            Ok(result) => self.handle_result(result).await,
            Err(_) => self.finish_run(),
        }
        Some(item)
    }

    /// Drive the session until it ends, passing every result to `on_result`.
    pub async fn run<F>(&mut self, mut on_result: F) -> WatchResult<()>
    where
        F: FnMut(&CheckResult),
    {
        self.start();
        while let Some(item) = self.next_result().await {
            on_result(&item?);
        }
        Ok(())
    }

    fn finish_run(&mut self) {
        self.handle = None;
        self.throttle = self.throttle.reset();
    }

    async fn handle_result(&mut self, result: &CheckResult) {
        let (notification, next) = self.throttle.observe(&result.windows);
        self.throttle = next;

        let Some(notification) = notification else {
            return;
        };
        let body = notification.message();
        match self.notifier.send_message(&self.recipient, &body).await {
            Ok(()) => tracing::info!("Notified {}: {body}", self.recipient),
            Err(e) => tracing::warn!("Could not notify {}: {e}", self.recipient),
        }
    }
}
