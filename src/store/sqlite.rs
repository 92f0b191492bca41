//! SQLite-backed [`ListingStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::ListingStore;
use crate::models::Listing;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and ensure the schema exists
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        info!("Opened listing database {}", path.display());
        Self::with_pool(pool).await
    }

    /// Private in-memory database; lives as long as the store
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                external_id    TEXT PRIMARY KEY,
                kind           TEXT,
                district       TEXT,
                location       TEXT,
                address        TEXT,
                price          TEXT,
                bedrooms       TEXT,
                living_area    TEXT,
                more_info      TEXT,
                last_modified  TEXT,
                link           TEXT NOT NULL,
                raw_attributes TEXT NOT NULL DEFAULT '{}',
                first_seen     TEXT NOT NULL,
                last_seen      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create listings table")?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM listings")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

fn listing_from_row(row: &SqliteRow) -> Result<Listing> {
    let last_modified: Option<String> = row.try_get("last_modified")?;
    let last_modified = last_modified
        .map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT))
        .transpose()
        .context("Invalid last_modified in database")?;

    let raw_attributes: String = row.try_get("raw_attributes")?;
    let first_seen: String = row.try_get("first_seen")?;
    let last_seen: String = row.try_get("last_seen")?;

    Ok(Listing {
        external_id: row.try_get("external_id")?,
        kind: row.try_get("kind")?,
        district: row.try_get("district")?,
        location: row.try_get("location")?,
        address: row.try_get("address")?,
        price: row.try_get("price")?,
        bedrooms: row.try_get("bedrooms")?,
        living_area: row.try_get("living_area")?,
        more_info: row.try_get("more_info")?,
        last_modified,
        link: row.try_get("link")?,
        raw_attributes: serde_json::from_str(&raw_attributes)
            .context("Invalid raw_attributes in database")?,
        first_seen: parse_timestamp(&first_seen)?,
        last_seen: parse_timestamp(&last_seen)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp in database: {}", s))?
        .with_timezone(&Utc))
}

#[async_trait]
impl ListingStore for SqliteStore {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Listing>> {
        let row = sqlx::query("SELECT * FROM listings WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(listing_from_row).transpose()
    }

    async fn save(&self, listing: &Listing) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO listings (external_id, kind, district, location, address, price,
                                  bedrooms, living_area, more_info, last_modified, link,
                                  raw_attributes, first_seen, last_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                kind = excluded.kind,
                district = excluded.district,
                location = excluded.location,
                address = excluded.address,
                price = excluded.price,
                bedrooms = excluded.bedrooms,
                living_area = excluded.living_area,
                more_info = excluded.more_info,
                last_modified = excluded.last_modified,
                link = excluded.link,
                raw_attributes = excluded.raw_attributes,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&listing.external_id)
        .bind(&listing.kind)
        .bind(&listing.district)
        .bind(&listing.location)
        .bind(&listing.address)
        .bind(&listing.price)
        .bind(&listing.bedrooms)
        .bind(&listing.living_area)
        .bind(&listing.more_info)
        .bind(listing.last_modified.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(&listing.link)
        .bind(listing.raw_attributes.to_string())
        .bind(listing.first_seen.to_rfc3339())
        .bind(listing.last_seen.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save listing {}", listing.external_id))?;

        Ok(())
    }
}
