//! # Listing Harvester
//!
//! Periodically collects rental listings from a classifieds site and keeps
//! one normalized record per listing in a local store.
//!
//! A cycle walks the pipeline in order:
//!
//! 1. **Endpoints**: a preconfigured filtered search, or one search per area
//!    found on the city overview page ([`scrapers::areas`])
//! 2. **Search pages**: paginate each endpoint and collect listing ids
//!    ([`scrapers::search`])
//! 3. **Detail pages**: scrape label/value pairs per listing
//!    ([`scrapers::detail`])
//! 4. **Upsert**: normalize and merge into the [`store`] ([`upsert`])
//!
//! [`pipeline::Pipeline`] drives a cycle; [`schedule`] repeats it on a fixed delay.

pub mod config;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod schedule;
pub mod scrapers;
pub mod store;
pub mod upsert;
