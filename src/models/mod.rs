use chrono::{DateTime, NaiveDate, Utc};

/// Persisted listing record, unique per `external_id`
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub external_id: String,
    pub kind: Option<String>,
    pub district: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub price: Option<String>,
    pub bedrooms: Option<String>,
    pub living_area: Option<String>,
    pub more_info: Option<String>,
    pub last_modified: Option<NaiveDate>,
    pub link: String,
    /// Every label/value pair seen on the detail page, including ones not modelled above
    pub raw_attributes: serde_json::Value,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Listing {
    /// Empty record for an identifier seen for the first time
    pub fn new(external_id: impl Into<String>, link: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            external_id: external_id.into(),
            kind: None,
            district: None,
            location: None,
            address: None,
            price: None,
            bedrooms: None,
            living_area: None,
            more_info: None,
            last_modified: None,
            link: link.into(),
            raw_attributes: serde_json::Value::Object(Default::default()),
            first_seen: now,
            last_seen: now,
        }
    }
}

/// Label/value pairs scraped from one detail page.
///
/// Keys are unique and keep the position of their first occurrence; inserting
/// an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

/// What happened to one identifier during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// No attribute data could be obtained this cycle
    Skipped,
    Failed(String),
}

/// Aggregated result of one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub endpoints: usize,
    pub identifiers: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Endpoints whose pagination ended on an error instead of an empty page
    pub stopped_endpoints: Vec<String>,
    /// Endpoints cut off by the page cap while pages still had listings
    pub capped_endpoints: Vec<String>,
    pub area_discovery_failed: bool,
}

impl CycleReport {
    pub fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped => self.skipped += 1,
            UpsertOutcome::Failed(_) => self.failed += 1,
        }
    }
}
