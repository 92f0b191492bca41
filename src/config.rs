use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Placeholder substituted with an area token in `site.area_search_template`
pub const AREA_PLACEHOLDER: &str = "{area}";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub db: DbConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SiteConfig {
    /// Detail pages live at `{base_url}/listing/{id}`
    pub base_url: String,
    pub area_overview_url: String,
    pub area_search_template: String,
    /// When non-empty, the only endpoint crawled; area discovery is skipped
    pub filtered_search_url: String,
    pub area_separator: String,
    pub page_param: String,
    pub currency_symbol: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.realitica.com/en".to_string(),
            area_overview_url: "https://www.realitica.com/rentals/podgorica/Montenegro/".to_string(),
            area_search_template: format!(
                "https://www.realitica.com/index.php?for=DuziNajam&lng=en&opa=Podgorica&cty%5B%5D={}",
                AREA_PLACEHOLDER
            ),
            filtered_search_url: String::new(),
            area_separator: "+".to_string(),
            page_param: "cur_page".to_string(),
            currency_symbol: "€".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn listing_prefix(&self) -> String {
        format!("{}/listing/", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CrawlConfig {
    pub page_max_attempts: u32,
    /// Most search pages fetched per endpoint; 0 disables the cap
    pub max_pages: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub detail_retries: u32,
    pub upsert_retries: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_max_attempts: 8,
            max_pages: 250,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            detail_retries: 1,
            upsert_retries: 1,
        }
    }
}

impl CrawlConfig {
    pub fn page_cap(&self) -> Option<u32> {
        (self.max_pages > 0).then_some(self.max_pages)
    }

    /// Backoff used between attempts on the same search page
    pub fn page_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.page_max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    /// Backoff used for detail pages and store writes; `retries` extra attempts
    pub fn budget_retry(&self, retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            retries.saturating_add(1),
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 3600 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/listings.sqlite"),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if !config.site.area_search_template.contains(AREA_PLACEHOLDER) {
        anyhow::bail!(
            "site.area_search_template must contain the {} placeholder",
            AREA_PLACEHOLDER
        );
    }

    if config.crawl.page_max_attempts == 0 {
        anyhow::bail!("crawl.page_max_attempts must be >= 1");
    }

    if config.crawl.base_delay_ms > config.crawl.max_delay_ms {
        anyhow::bail!("crawl.base_delay_ms must not exceed crawl.max_delay_ms");
    }

    if config.schedule.interval_secs == 0 {
        anyhow::bail!("schedule.interval_secs must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.site.base_url, "https://www.realitica.com/en");
        assert_eq!(config.site.area_separator, "+");
        assert!(config.site.filtered_search_url.is_empty());
        assert_eq!(config.schedule.interval_secs, 3600);
        assert_eq!(config.crawl.page_cap(), Some(250));
    }

    #[test]
    fn zero_max_pages_disables_the_cap() {
        let config = parse_config("[crawl]\nmax_pages = 0").unwrap();
        assert_eq!(config.crawl.page_cap(), None);

        let config = parse_config("[crawl]\nmax_pages = 3").unwrap();
        assert_eq!(config.crawl.page_cap(), Some(3));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
            [site]
            filtered_search_url = "https://example.com/search?q=1"

            [crawl]
            page_max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.site.filtered_search_url, "https://example.com/search?q=1");
        assert_eq!(config.site.page_param, "cur_page");
        assert_eq!(config.crawl.page_max_attempts, 3);
        assert_eq!(config.crawl.detail_retries, 1);
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = parse_config(
            r#"
            [site]
            area_search_template = "https://example.com/search?area=%s"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("{area}"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        assert!(parse_config("[crawl]\npage_max_attempts = 0").is_err());
        assert!(parse_config("[schedule]\ninterval_secs = 0").is_err());
    }

    #[test]
    fn listing_prefix_ignores_trailing_slash() {
        let mut site = SiteConfig::default();
        site.base_url = "https://example.com/en/".to_string();
        assert_eq!(site.listing_prefix(), "https://example.com/en/listing/");
    }
}
