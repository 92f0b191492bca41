use anyhow::Result;
use scraper::Html;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::selector;
use super::traits::PageFetcher;
use super::types::{ListingUrls, SearchEndpoint};
use crate::retry::{self, RetryPolicy};

const THUMBNAIL_SELECTOR: &str = "div.thumb_div > a";

/// Why pagination of one endpoint ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A page without thumbnails; the normal end of results
    EmptyPage,
    /// The configured page cap was reached
    PageCap,
    /// A page kept failing or failed fatally
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub ids: HashSet<String>,
    /// Pages that contained thumbnails
    pub pages: u32,
    pub stop: StopReason,
}

/// Anchors found on one results page, and the listing ids among them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailPage {
    pub anchors: usize,
    pub ids: Vec<String>,
}

/// Walks the paginated results of a search endpoint collecting listing ids
pub struct SearchCrawler {
    fetcher: Arc<dyn PageFetcher>,
    urls: ListingUrls,
    retry: RetryPolicy,
    max_pages: Option<u32>,
}

impl SearchCrawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        urls: ListingUrls,
        retry: RetryPolicy,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            fetcher,
            urls,
            retry,
            max_pages,
        }
    }

    /// Fetch pages 0, 1, 2, ... until one has no thumbnails.
    ///
    /// A failing page is retried per the retry policy; once it gives up the
    /// ids gathered so far are still returned.
    pub async fn crawl(&self, endpoint: &SearchEndpoint) -> CrawlResult {
        let mut ids = HashSet::new();
        let mut page: u32 = 0;

        let stop = loop {
            if self.max_pages.map_or(false, |cap| page >= cap) {
                warn!(endpoint = %endpoint.url, page, "Page cap reached, stopping pagination");
                break StopReason::PageCap;
            }

            let url = endpoint.page_url(page);
            let what = format!("Loading search page {}", url);
            let result = retry::with_retry(&self.retry, &what, retry::is_retryable, || {
                self.load_page(&url)
            })
            .await;

            match result {
                Ok(thumbnails) if thumbnails.anchors == 0 => {
                    info!("Last page {}", page + 1);
                    break StopReason::EmptyPage;
                }
                Ok(thumbnails) => {
                    info!(
                        anchors = thumbnails.anchors,
                        listings = thumbnails.ids.len(),
                        "Loaded page {}",
                        page + 1
                    );
                    ids.extend(thumbnails.ids);
                    page += 1;
                }
                Err(err) => {
                    let reason = format!("{:#}", err);
                    error!(
                        endpoint = %endpoint.url,
                        page,
                        error = %reason,
                        "Can't load page with listings, giving up on endpoint"
                    );
                    break StopReason::Failed(reason);
                }
            }
        };

        CrawlResult {
            ids,
            pages: page,
            stop,
        }
    }

    async fn load_page(&self, url: &str) -> Result<ThumbnailPage> {
        let html = self.fetcher.fetch(url).await?;
        parse_thumbnails(&html, &self.urls)
    }
}

/// Collect the listing ids linked from result thumbnails
pub fn parse_thumbnails(html: &str, urls: &ListingUrls) -> Result<ThumbnailPage> {
    let document = Html::parse_document(html);
    let thumbnail_selector = selector(THUMBNAIL_SELECTOR)?;

    let mut anchors = 0;
    let mut ids = Vec::new();
    for element in document.select(&thumbnail_selector) {
        anchors += 1;
        if let Some(id) = element.value().attr("href").and_then(|href| urls.to_id(href)) {
            ids.push(id);
        }
    }

    Ok(ThumbnailPage { anchors, ids })
}
