//! Polling engine: repeated, cancellable fetch-and-scrape cycles.
//!
//! A session runs as one tokio task. It checks immediately, then once per
//! timer tick, and never overlaps two cycles: a slow cycle delays the next
//! tick instead of queueing it. Results go to a single consumer over a
//! channel that holds at most one unread item.
//!
//! Transport failures are logged and the tick is skipped. A page that cannot
//! be parsed ends the session; the error is the last item on the stream.
//! Dropping the result stream also ends the session, even while every cycle
//! is failing.

use crate::http_client::{HttpClient, DEFAULT_USER_AGENT};
use crate::request::OutboundRequest;
use crate::scrape::Scraper;
use crate::types::{CheckResult, WatchResult};
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Default time between checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One item on the result stream.
pub type PollItem = WatchResult<CheckResult>;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between the starts of consecutive cycles.
    pub interval: Duration,
    /// Timeout applied to each HTTP request.
    pub timeout: Duration,
    /// User agent sent when the captured request has none.
    pub user_agent: String,
    /// If set, every fetched page body is written here.
    pub dump_html: Option<PathBuf>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            dump_html: None,
        }
    }
}

/// Lifecycle of a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Running,
    Cancelled,
}

/// One-shot cancellation trigger for a running session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Signal the session to stop. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Engine-side view of the cancellation signal.
struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
    }

    fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Never resolves if every handle was dropped
    /// without cancelling.
    async fn cancelled(&mut self) {
        if self.rx.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Receiving end of a session's results.
pub struct ResultStream {
    inner: ReceiverStream<PollItem>,
}

impl ResultStream {
    /// Wait for the next result. `None` once the session has ended.
    pub async fn next(&mut self) -> Option<PollItem> {
        self.inner.next().await
    }
}

impl Stream for ResultStream {
    type Item = PollItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// A running polling session.
pub struct PollHandle {
    results: ResultStream,
    cancel: CancelHandle,
    state: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn results(&mut self) -> &mut ResultStream {
        &mut self.results
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Split into the result stream and the cancel trigger. The task keeps
    /// running until cancelled or until the stream is dropped.
    pub fn into_parts(self) -> (ResultStream, CancelHandle) {
        (self.results, self.cancel)
    }

    /// Cancel and wait for the task to release its timer and channel.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Polling task ended abnormally: {e}");
        }
    }
}

/// Drives fetch-and-scrape cycles for one outbound request.
#[derive(Clone)]
pub struct Poller {
    client: HttpClient,
    scraper: Scraper,
    config: PollerConfig,
}

impl Poller {
    pub fn new(config: PollerConfig) -> WatchResult<Self> {
        let client = HttpClient::with_user_agent(config.timeout, &config.user_agent)?;
        Ok(Self {
            client,
            scraper: Scraper::default(),
            config,
        })
    }

    /// Use a custom window selector instead of the checkout page default.
    pub fn with_scraper(mut self, scraper: Scraper) -> Self {
        self.scraper = scraper;
        self
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Run a single fetch-and-scrape cycle.
    pub async fn check_once(&self, request: &OutboundRequest) -> WatchResult<CheckResult> {
        let resp = self.client.fetch(request).await?;

        if let Some(path) = &self.config.dump_html {
            if let Err(e) = tokio::fs::write(path, &resp.body).await {
                tracing::warn!("Could not write page dump to {}: {e}", path.display());
            }
        }

        let windows = self.scraper.parse(&resp.body)?;
        Ok(CheckResult::new(windows))
    }

    /// Start a polling session on the current tokio runtime.
    pub fn start(&self, request: OutboundRequest) -> PollHandle {
        let (tx, rx) = mpsc::channel(1);
        let (cancel, signal) = CancelSignal::pair();
        let (state_tx, state_rx) = watch::channel(PollState::Idle);

        let poller = self.clone();
        let task = tokio::spawn(async move {
            poller.run(request, tx, signal, state_tx).await;
        });

        PollHandle {
            results: ResultStream {
                inner: ReceiverStream::new(rx),
            },
            cancel,
            state: state_rx,
            task,
        }
    }

    async fn run(
        self,
        request: OutboundRequest,
        tx: mpsc::Sender<PollItem>,
        mut cancel: CancelSignal,
        state: watch::Sender<PollState>,
    ) {
        state.send_replace(PollState::Running);
        tracing::info!(
            "Polling {} every {}s",
            request.url(),
            self.config.interval.as_secs()
        );

        // The first tick completes immediately.
        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tx.closed() => {
                    tracing::debug!("Result stream dropped, stopping");
                    break;
                }
                _ = ticker.tick() => {}
            }
            if cancel.is_cancelled() {
                break;
            }
            cycle += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Cycle {cycle} aborted by cancellation");
                    break;
                }
                _ = tx.closed() => {
                    tracing::debug!("Result stream dropped during cycle {cycle}, stopping");
                    break;
                }
                outcome = self.check_once(&request) => outcome,
            };

            match outcome {
                Ok(result) => {
                    tracing::debug!("Cycle {cycle}: {} window(s)", result.len());
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        sent = tx.send(Ok(result)) => sent,
                    };
                    if sent.is_err() {
                        tracing::debug!("Result stream dropped, stopping");
                        break;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Cycle {cycle} failed, skipping this tick: {e}");
                }
                Err(e) => {
                    tracing::error!("Cycle {cycle} failed fatally: {e}");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = tx.send(Err(e)) => {}
                    }
                    break;
                }
            }
        }

        state.send_replace(PollState::Cancelled);
        tracing::info!("Polling stopped after {cycle} cycle(s)");
    }
}

/// Start polling `request` every `interval` with default settings.
pub fn start_polling(interval: Duration, request: OutboundRequest) -> WatchResult<PollHandle> {
    let poller = Poller::new(PollerConfig {
        interval,
        ..PollerConfig::default()
    })?;
    Ok(poller.start(request))
}
