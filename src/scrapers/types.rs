use crate::config::{SiteConfig, AREA_PLACEHOLDER};

/// Conversion between listing identifiers and canonical detail-page URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingUrls {
    prefix: String,
}

impl ListingUrls {
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            prefix: site.listing_prefix(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn to_url(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Bare identifier for a canonical detail URL; `None` for any other link
    pub fn to_id(&self, url: &str) -> Option<String> {
        url.strip_prefix(self.prefix.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// One search-filter URL, without the pagination parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoint {
    pub url: String,
    page_param: String,
}

impl SearchEndpoint {
    pub fn new(url: impl Into<String>, page_param: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page_param: page_param.into(),
        }
    }

    /// Search URL for one area token
    pub fn for_area(site: &SiteConfig, area: &str) -> Self {
        Self::new(
            site.area_search_template.replace(AREA_PLACEHOLDER, area),
            site.page_param.clone(),
        )
    }

    pub fn page_url(&self, page: u32) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}={}", self.url, separator, self.page_param, page)
    }
}
