use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::ListingStore;
use crate::models::Listing;

/// In-memory store for tests and `--memory` runs
pub struct InMemoryStore {
    listings: RwLock<HashMap<String, Listing>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.listings.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingStore for InMemoryStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Listing>> {
        let listings = self
            .listings
            .read()
            .map_err(|_| anyhow::anyhow!("listing store lock poisoned"))?;
        Ok(listings.get(external_id).cloned())
    }

    async fn save(&self, listing: &Listing) -> Result<()> {
        let mut listings = self
            .listings
            .write()
            .map_err(|_| anyhow::anyhow!("listing store lock poisoned"))?;
        listings.insert(listing.external_id.clone(), listing.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_overwrites_by_external_id() {
        let store = InMemoryStore::new();
        let mut listing = Listing::new("42", "https://example.com/listing/42");
        store.save(&listing).await.unwrap();

        listing.price = Some("500".to_string());
        store.save(&listing).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.find_by_external_id("42").await.unwrap().unwrap();
        assert_eq!(stored.price.as_deref(), Some("500"));
        assert!(store.find_by_external_id("43").await.unwrap().is_none());
    }
}
