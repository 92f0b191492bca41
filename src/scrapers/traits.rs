use async_trait::async_trait;

use super::http::FetchError;

/// Source of raw HTML pages.
/// The crawler, the area discovery and the detail extractor only see this
/// trait, so tests can script page sequences without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its body
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
