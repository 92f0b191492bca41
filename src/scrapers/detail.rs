//! Detail-page attribute extraction.
//!
//! Listing pages carry their data as inline pairs:
//!
//! ```html
//! <div><strong>Price</strong>: €450<br><strong>Bedrooms</strong>: 2</div>
//! ```
//!
//! Every element's direct children are flattened into [`Fragment`]s and fed
//! through a two-state scanner, so the pairing rule does not depend on the
//! markup tree API.

use anyhow::Result;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::selector;
use super::traits::PageFetcher;
use super::types::ListingUrls;
use crate::models::Attributes;
use crate::retry::{self, RetryPolicy};

const CONTAINER_SELECTOR: &str = "div";
const LABEL_TAG: &str = "strong";
const VALUE_MARKER: &str = ": ";

/// One direct child of a container element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A `<strong>` element, with its text
    Label(String),
    Text(String),
    Other,
}

enum ScanState {
    AwaitingLabel,
    ExpectingValue(String),
}

/// Pair each label with the text node that immediately follows it, when that
/// text starts with `": "`
pub fn scan_pairs<I>(fragments: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = Fragment>,
{
    let mut pairs = Vec::new();
    let mut state = ScanState::AwaitingLabel;

    for fragment in fragments {
        state = match (state, fragment) {
            (_, Fragment::Label(label)) => ScanState::ExpectingValue(label),
            (ScanState::ExpectingValue(label), Fragment::Text(text))
                if text.starts_with(VALUE_MARKER) =>
            {
                pairs.push((label, clean_value(&text)));
                ScanState::AwaitingLabel
            }
            _ => ScanState::AwaitingLabel,
        };
    }

    pairs
}

/// `": €450 "` becomes `"€450"`
fn clean_value(text: &str) -> String {
    text.strip_prefix(':').unwrap_or(text).trim().to_string()
}

fn fragments(element: ElementRef<'_>) -> Vec<Fragment> {
    element
        .children()
        .map(|child| match child.value() {
            Node::Text(text) => Fragment::Text(str::to_string(&text.text)),
            Node::Element(el) if el.name() == LABEL_TAG => ElementRef::wrap(child)
                .map(|label| Fragment::Label(collapse_whitespace(&label.text().collect::<String>())))
                .unwrap_or(Fragment::Other),
            _ => Fragment::Other,
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All label/value pairs on a detail page; later duplicates win
pub fn parse_attributes(html: &str) -> Result<Attributes> {
    let document = Html::parse_document(html);
    let container_selector = selector(CONTAINER_SELECTOR)?;

    let mut attributes = Attributes::new();
    for container in document.select(&container_selector) {
        for (label, value) in scan_pairs(fragments(container)) {
            attributes.insert(label, value);
        }
    }

    Ok(attributes)
}

/// Fetches listing detail pages and turns them into [`Attributes`]
pub struct AttributeExtractor {
    fetcher: Arc<dyn PageFetcher>,
    urls: ListingUrls,
    retry: RetryPolicy,
}

impl AttributeExtractor {
    /// `retry` carries the delays; the attempt count comes from each call's budget
    pub fn new(fetcher: Arc<dyn PageFetcher>, urls: ListingUrls, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            urls,
            retry,
        }
    }

    /// Attributes of one listing, or `None` once `retries` extra attempts are
    /// used up. Failures are logged, never returned.
    pub async fn extract(&self, id: &str, retries: u32) -> Option<Attributes> {
        let policy = RetryPolicy {
            max_attempts: retries.saturating_add(1),
            ..self.retry
        };
        let url = self.urls.to_url(id);
        let what = format!("Loading listing {}", id);

        info!("Loading listing {}", id);
        let result = retry::with_retry(&policy, &what, retry::is_retryable, || self.load(&url)).await;

        match result {
            Ok(attributes) => {
                if attributes.is_empty() {
                    warn!(%url, "Listing page has no attributes");
                }
                Some(attributes)
            }
            Err(err) => {
                error!(id, error = %format!("{:#}", err), "Can't load listing");
                None
            }
        }
    }

    async fn load(&self, url: &str) -> Result<Attributes> {
        let html = self.fetcher.fetch(url).await?;
        parse_attributes(&html)
    }
}
