//! slotwatch: replay a captured checkout request and watch for delivery windows.
//!
//! The pipeline is: load a HAR archive, pick the checkout request out of it,
//! turn it into a replayable GET, poll it on a timer while scraping each page
//! for delivery window labels, and throttle the resulting notifications.

pub mod archive;
pub mod http_client;
pub mod notify;
pub mod poller;
pub mod request;
pub mod scrape;
pub mod session;
pub mod types;

pub use archive::{find_checkout_request, load_archive, Archive, Entry, Pair, Request, CHECKOUT_URL};
pub use notify::{Notification, Notifier, ThrottleState, DEFAULT_QUOTA};
pub use poller::{
    start_polling, CancelHandle, PollHandle, PollItem, PollState, Poller, PollerConfig,
    ResultStream,
};
pub use request::{build_request, OutboundRequest};
pub use scrape::{parse_windows, Scraper, WINDOW_SELECTOR};
pub use session::PollSession;
pub use types::*;
