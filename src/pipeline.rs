//! One harvesting cycle: endpoints → search pages → detail pages → store.
//!
//! Everything runs sequentially on the calling task. Only area discovery can
//! fail a step of the cycle; per-page and per-listing failures are absorbed
//! and show up in the [`CycleReport`].

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::CycleReport;
use crate::scrapers::{
    discover_areas, AttributeExtractor, ListingUrls, PageFetcher, SearchCrawler, SearchEndpoint,
    StopReason,
};
use crate::store::ListingStore;
use crate::upsert::RecordUpserter;

pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn PageFetcher>,
    crawler: SearchCrawler,
    upserter: RecordUpserter,
}

impl Pipeline {
    pub fn new(config: Config, fetcher: Arc<dyn PageFetcher>, store: Arc<dyn ListingStore>) -> Self {
        let urls = ListingUrls::new(&config.site);

        let crawler = SearchCrawler::new(
            Arc::clone(&fetcher),
            urls.clone(),
            config.crawl.page_retry(),
            config.crawl.page_cap(),
        );

        let extractor = AttributeExtractor::new(
            Arc::clone(&fetcher),
            urls.clone(),
            config.crawl.budget_retry(config.crawl.detail_retries),
        );

        let upserter = RecordUpserter::new(
            extractor,
            store,
            urls,
            config.site.currency_symbol.clone(),
            config.crawl.detail_retries,
            config.crawl.budget_retry(config.crawl.upsert_retries),
        );

        Self {
            config,
            fetcher,
            crawler,
            upserter,
        }
    }

    /// The configured filtered search alone, or one endpoint per discovered area
    pub async fn build_endpoints(&self) -> Result<Vec<SearchEndpoint>> {
        let site = &self.config.site;

        if !site.filtered_search_url.is_empty() {
            return Ok(vec![SearchEndpoint::new(
                site.filtered_search_url.clone(),
                site.page_param.clone(),
            )]);
        }

        let areas = discover_areas(
            self.fetcher.as_ref(),
            &site.area_overview_url,
            &site.area_separator,
        )
        .await?;

        Ok(areas
            .iter()
            .map(|area| SearchEndpoint::for_area(site, area))
            .collect())
    }

    /// Run one full cycle and return what happened
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let endpoints = match self.build_endpoints().await {
            Ok(endpoints) => endpoints,
            Err(err) => {
                error!(
                    error = %format!("{:#}", err),
                    "Area discovery failed, skipping this cycle's area search"
                );
                report.area_discovery_failed = true;
                Vec::new()
            }
        };
        report.endpoints = endpoints.len();

        for endpoint in &endpoints {
            info!("Start to load by filter: {}", endpoint.url);

            let crawl = self.crawler.crawl(endpoint).await;
            match &crawl.stop {
                StopReason::Failed(reason) => {
                    warn!(
                        endpoint = %endpoint.url,
                        reason = %reason,
                        "Pagination stopped early, processing collected listings"
                    );
                    report.stopped_endpoints.push(endpoint.url.clone());
                }
                StopReason::PageCap => report.capped_endpoints.push(endpoint.url.clone()),
                StopReason::EmptyPage => {}
            }
            info!(
                endpoint = %endpoint.url,
                pages = crawl.pages,
                listings = crawl.ids.len(),
                "Collected listing ids"
            );

            report.identifiers += crawl.ids.len();
            for id in &crawl.ids {
                let outcome = self.upserter.upsert(id, self.config.crawl.upsert_retries).await;
                report.record(&outcome);
            }
        }

        info!(
            endpoints = report.endpoints,
            identifiers = report.identifiers,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            stopped_endpoints = report.stopped_endpoints.len(),
            capped_endpoints = report.capped_endpoints.len(),
            area_discovery_failed = report.area_discovery_failed,
            "Cycle finished"
        );

        report
    }
}
