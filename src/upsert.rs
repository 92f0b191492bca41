use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::{Attributes, Listing, UpsertOutcome};
use crate::retry::{self, RetryPolicy};
use crate::scrapers::{AttributeExtractor, ListingUrls};
use crate::store::{self, ListingStore};

/// Format of the "Last Modified" attribute, e.g. `6 Oct, 2020`
pub const LAST_MODIFIED_FORMAT: &str = "%d %b, %Y";
/// Same with the month spelled out, e.g. `6 October, 2020`
pub const LAST_MODIFIED_LONG_FORMAT: &str = "%d %B, %Y";

pub const TYPE: &str = "Type";
pub const DISTRICT: &str = "District";
pub const LOCATION: &str = "Location";
pub const ADDRESS: &str = "Address";
pub const PRICE: &str = "Price";
pub const BEDROOMS: &str = "Bedrooms";
pub const LIVING_AREA: &str = "Living Area";
pub const MORE_INFO: &str = "More info at";
pub const LAST_MODIFIED: &str = "Last Modified";

pub fn parse_last_modified(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, LAST_MODIFIED_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, LAST_MODIFIED_LONG_FORMAT))
        .ok()
}

/// Drop the currency symbol; prices without one pass through untouched
pub fn normalize_price(price: &str, currency_symbol: &str) -> String {
    if currency_symbol.is_empty() || !price.contains(currency_symbol) {
        return price.to_string();
    }
    price.replace(currency_symbol, "").trim().to_string()
}

/// Overwrite every normalized field of `listing` from a fresh attribute mapping
pub fn apply_attributes(
    listing: &mut Listing,
    attributes: &Attributes,
    urls: &ListingUrls,
    currency_symbol: &str,
) {
    let field = |key: &str| attributes.get(key).map(str::to_string);

    let last_modified = attributes.get(LAST_MODIFIED).and_then(|value| {
        let parsed = parse_last_modified(value);
        if parsed.is_none() {
            error!(id = %listing.external_id, value, "Can't parse last modified date");
        }
        parsed
    });

    listing.kind = field(TYPE);
    listing.district = field(DISTRICT);
    listing.location = field(LOCATION);
    listing.address = field(ADDRESS);
    listing.price = attributes
        .get(PRICE)
        .map(|price| normalize_price(price, currency_symbol));
    listing.bedrooms = field(BEDROOMS);
    listing.living_area = field(LIVING_AREA);
    listing.more_info = field(MORE_INFO);
    listing.last_modified = last_modified;
    listing.link = urls.to_url(&listing.external_id);
    listing.raw_attributes = attributes.to_json();
    listing.last_seen = Utc::now();
}

/// Extracts a listing and merges it into the store
pub struct RecordUpserter {
    extractor: AttributeExtractor,
    store: Arc<dyn ListingStore>,
    urls: ListingUrls,
    currency_symbol: String,
    detail_retries: u32,
    retry: RetryPolicy,
}

impl RecordUpserter {
    /// `retry` carries the delays between store attempts; `detail_retries` is
    /// the extractor budget for every listing
    pub fn new(
        extractor: AttributeExtractor,
        store: Arc<dyn ListingStore>,
        urls: ListingUrls,
        currency_symbol: impl Into<String>,
        detail_retries: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            extractor,
            store,
            urls,
            currency_symbol: currency_symbol.into(),
            detail_retries,
            retry,
        }
    }

    /// Extract `id` and write it to the store. Never fails: problems are
    /// logged and reported through the outcome. `retries` extra attempts are
    /// allowed for the store lookup and write.
    pub async fn upsert(&self, id: &str, retries: u32) -> UpsertOutcome {
        let Some(attributes) = self.extractor.extract(id, self.detail_retries).await else {
            warn!(id, "No data for listing, skipping this cycle");
            return UpsertOutcome::Skipped;
        };

        self.merge(id, &attributes, retries).await
    }

    /// Merge an already extracted mapping into the store
    pub async fn merge(&self, id: &str, attributes: &Attributes, retries: u32) -> UpsertOutcome {
        let policy = RetryPolicy {
            max_attempts: retries.saturating_add(1),
            ..self.retry
        };
        let what = format!("Saving listing {}", id);

        // Only connection-level store errors are worth another attempt
        let result = retry::with_retry(&policy, &what, store::is_transient, || {
            self.write(id, attributes)
        })
        .await;

        match result {
            Ok(outcome) => {
                info!(id, ?outcome, "Saved listing");
                outcome
            }
            Err(err) => {
                let reason = format!("{:#}", err);
                error!(id, error = %reason, "Can't save listing");
                UpsertOutcome::Failed(reason)
            }
        }
    }

    async fn write(&self, id: &str, attributes: &Attributes) -> Result<UpsertOutcome> {
        let (mut listing, outcome) = match self.store.find_by_external_id(id).await? {
            Some(existing) => (existing, UpsertOutcome::Updated),
            None => (
                Listing::new(id, self.urls.to_url(id)),
                UpsertOutcome::Created,
            ),
        };

        apply_attributes(&mut listing, attributes, &self.urls, &self.currency_symbol);
        self.store.save(&listing).await?;

        Ok(outcome)
    }
}
