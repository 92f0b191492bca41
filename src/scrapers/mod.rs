pub mod areas;
pub mod detail;
pub mod http;
pub mod search;
pub mod traits;
pub mod types;

pub use areas::discover_areas;
pub use detail::AttributeExtractor;
pub use http::{FetchError, HttpFetcher};
pub use search::{CrawlResult, SearchCrawler, StopReason};
pub use traits::PageFetcher;
pub use types::{ListingUrls, SearchEndpoint};

use anyhow::Result;
use scraper::Selector;

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid selector {:?}: {}", css, e))
}
