use anyhow::{Context, Result};
use scraper::Html;
use tracing::{debug, info};

use super::traits::PageFetcher;
use super::selector;

const AREA_LABEL_SELECTOR: &str = "#search_col2 span.geosel";

/// Fetch the city overview page once and return its area tokens.
/// Errors propagate; there is no retry on this path.
pub async fn discover_areas(
    fetcher: &dyn PageFetcher,
    overview_url: &str,
    separator: &str,
) -> Result<Vec<String>> {
    info!("Discovering areas from {}", overview_url);

    let html = fetcher
        .fetch(overview_url)
        .await
        .with_context(|| format!("Failed to fetch area overview {}", overview_url))?;

    let areas = parse_area_tokens(&html, separator)?;
    info!(count = areas.len(), "Loaded areas");
    debug!(?areas, "Area tokens");

    Ok(areas)
}

/// Area tokens in page order, deduplicated
pub fn parse_area_tokens(html: &str, separator: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let label_selector = selector(AREA_LABEL_SELECTOR)?;

    let mut areas: Vec<String> = Vec::new();
    for element in document.select(&label_selector) {
        let text = element.text().collect::<String>();
        if let Some(token) = area_token(&text, separator) {
            if !areas.contains(&token) {
                areas.push(token);
            }
        }
    }

    Ok(areas)
}

/// `"Stari Aerodrom (120)"` becomes `"Stari{separator}Aerodrom"`
pub fn area_token(display_text: &str, separator: &str) -> Option<String> {
    let name = display_text
        .split(" (")
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() {
        return None;
    }

    Some(name.split_whitespace().collect::<Vec<_>>().join(separator))
}
