//! Accepted-offer history in SQLite.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use pricewatch::Offer;

/// Offer history backed by SQLite.
pub struct OfferStore {
    db: Connection,
}

impl OfferStore {
    /// Open or create the offer database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let db = Connection::open(path)
            .with_context(|| format!("failed to open offer database: {}", path.display()))?;
        Self::init(db)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS offers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                store TEXT,
                title TEXT,
                url TEXT,
                price_pln REAL,
                found_at TEXT,
                UNIQUE(store, url, price_pln, found_at)
            );",
        )
        .context("failed to create offers table")?;
        Ok(Self { db })
    }

    /// Record priced offers. Unpriced offers and exact repeats are skipped.
    /// Returns the number of new rows.
    pub fn insert_offers(&self, offers: &[Offer], found_at: &str) -> Result<usize> {
        let mut stmt = self.db.prepare_cached(
            "INSERT OR IGNORE INTO offers (store, title, url, price_pln, found_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        let mut inserted = 0;
        for offer in offers {
            let Some(price) = offer.price else { continue };
            inserted += stmt.execute(rusqlite::params![
                offer.store,
                offer.title,
                offer.url,
                price,
                found_at
            ])?;
        }
        Ok(inserted)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM offers", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
