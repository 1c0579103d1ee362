//! Delivery window extraction from a checkout page.
//!
//! Uses the `scraper` crate for CSS selector matching. HTML parsing itself is
//! error-tolerant, so the only hard failures are a body that is not text and
//! a selector that does not compile. Text in a legacy charset is decoded
//! lossily rather than rejected.

use crate::types::{DeliveryWindow, WatchError, WatchResult};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;

/// Path to the label of each delivery window radio button.
pub const WINDOW_SELECTOR: &str = "div.delivery-window-radio-button-section \
                                   span.a-radio-label \
                                   > span[data-testid].a-color-base";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compiled window selector.
#[derive(Debug, Clone)]
pub struct Scraper {
    selector: Selector,
}

impl Scraper {
    /// Build a scraper for a custom CSS selector.
    pub fn new(selector: &str) -> WatchResult<Self> {
        let selector = Selector::parse(selector)
            .map_err(|e| WatchError::PageParse(format!("invalid selector '{selector}': {e}")))?;
        Ok(Self { selector })
    }

    /// Collect window labels from an HTML document, in document order.
    pub fn windows_in(&self, html: &str) -> Vec<DeliveryWindow> {
        let document = Html::parse_document(html);
        document
            .select(&self.selector)
            .map(|el| DeliveryWindow(element_text(&el)))
            .collect()
    }

    /// Decode a response body and collect window labels from it.
    pub fn parse(&self, body: &[u8]) -> WatchResult<Vec<DeliveryWindow>> {
        let html = decode_body(body)?;
        Ok(self.windows_in(&html))
    }
}

impl Default for Scraper {
    fn default() -> Self {
        Self {
            selector: Selector::parse(WINDOW_SELECTOR).expect("window selector is valid"),
        }
    }
}

/// Parse delivery windows out of a checkout page body.
pub fn parse_windows(body: &[u8]) -> WatchResult<Vec<DeliveryWindow>> {
    Scraper::default().parse(body)
}

fn decode_body(body: &[u8]) -> WatchResult<Cow<'_, str>> {
    if body.starts_with(&GZIP_MAGIC) {
        return Err(WatchError::PageParse(
            "body is still gzip-compressed".to_string(),
        ));
    }
    if body.contains(&0) {
        return Err(WatchError::PageParse(
            "body is binary, not an HTML document".to_string(),
        ));
    }
    let html = String::from_utf8_lossy(body);
    if let Cow::Owned(_) = html {
        tracing::debug!("Page body is not UTF-8, decoded lossily");
    }
    Ok(html)
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
