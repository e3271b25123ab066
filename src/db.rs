use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{OptimizerError, Result};
use crate::listing::{Asin, OptimizedRecord};

/// Default number of rows returned by `recent`
pub const DEFAULT_RECENT_LIMIT: usize = 100;

const ROW_COLUMNS: &str = "id, asin, original_title, original_bullets, original_description,
     optimized_title, optimized_bullets, optimized_description, keywords, created_at";

/// Safely convert a Unix timestamp to DateTime<Utc>, falling back to current time if invalid
fn timestamp_to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Encode a list column as a JSON array
pub fn encode_list(items: &[String]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

/// Decode a list column. NULL, empty and unreadable values all decode to an empty list.
pub fn decode_list(raw: Option<&str>) -> Vec<String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
            warn!(error = %e, "unreadable list column, treating as empty");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// One stored optimization, shaped like the table it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationRow {
    pub id: i64,
    pub asin: String,
    pub original_title: String,
    pub original_bullets: Vec<String>,
    pub original_description: String,
    pub optimized_title: String,
    pub optimized_bullets: Vec<String>,
    pub optimized_description: String,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl OptimizationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let text = |idx: usize| -> rusqlite::Result<String> {
            Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
        };
        let list = |idx: usize| -> rusqlite::Result<Vec<String>> {
            Ok(decode_list(row.get::<_, Option<String>>(idx)?.as_deref()))
        };

        Ok(Self {
            id: row.get(0)?,
            asin: row.get(1)?,
            original_title: text(2)?,
            original_bullets: list(3)?,
            original_description: text(4)?,
            optimized_title: text(5)?,
            optimized_bullets: list(6)?,
            optimized_description: text(7)?,
            keywords: list(8)?,
            created_at: timestamp_to_datetime(row.get(9)?),
        })
    }
}

/// Where finished optimizations are persisted
pub trait ListingStore {
    /// Persist a record, returning it as stored (with its id and timestamp)
    fn save(&self, record: &OptimizedRecord) -> Result<OptimizationRow>;
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database
    pub fn open() -> Result<Self> {
        let db_path = Config::db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&db_path)?;
        embedded::migrations::runner().run(&mut conn)?;
        debug!(path = %db_path.display(), "database ready");

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(Self { conn })
    }

    /// Get one optimization by id
    pub fn get(&self, id: i64) -> Result<Option<OptimizationRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM optimizations WHERE id = ?1", ROW_COLUMNS),
                params![id],
                OptimizationRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All optimizations of one ASIN, newest first
    pub fn history(&self, asin: &Asin) -> Result<Vec<OptimizationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM optimizations WHERE asin = ?1 ORDER BY created_at DESC, id DESC",
            ROW_COLUMNS
        ))?;
        let rows = stmt.query_map(params![asin.as_str()], OptimizationRow::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent optimizations across all ASINs, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<OptimizationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM optimizations ORDER BY created_at DESC, id DESC LIMIT ?1",
            ROW_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], OptimizationRow::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Newest optimization of one ASIN
    pub fn latest(&self, asin: &Asin) -> Result<Option<OptimizationRow>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM optimizations WHERE asin = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                    ROW_COLUMNS
                ),
                params![asin.as_str()],
                OptimizationRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Check whether an ASIN has been optimized before
    pub fn asin_exists(&self, asin: &Asin) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM optimizations WHERE asin = ?1",
            params![asin.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl ListingStore for Database {
    fn save(&self, record: &OptimizedRecord) -> Result<OptimizationRow> {
        self.conn.execute(
            "INSERT INTO optimizations (asin, original_title, original_bullets, original_description,
             optimized_title, optimized_bullets, optimized_description, keywords)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.asin.as_str(),
                record.original.title,
                encode_list(&record.original.bullet_points)?,
                record.original.description,
                record.optimized.optimized_title,
                encode_list(&record.optimized.optimized_bullet_points)?,
                record.optimized.optimized_description,
                encode_list(&record.optimized.keywords)?,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, asin = %record.asin, "saved optimization");
        self.get(id)?.ok_or(OptimizerError::RecordNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::OptimizedListing;
    use crate::model::{synthetic_listing, synthetic_product};
    use crate::orchestrator::Provenance;

    fn record(asin: &str) -> OptimizedRecord {
        let asin = Asin::parse(asin).unwrap();
        let original = synthetic_product(&asin);
        let optimized = synthetic_listing(&original);
        OptimizedRecord {
            id: None,
            asin,
            original,
            optimized,
            created_at: Utc::now(),
            provenance: Provenance::default(),
        }
    }

    #[test]
    fn test_list_round_trip() {
        let items = vec!["a".to_string(), "b".to_string()];
        let encoded = encode_list(&items).unwrap();
        assert_eq!(decode_list(Some(&encoded)), items);
    }

    #[test]
    fn test_decode_list_tolerates_bad_columns() {
        assert!(decode_list(None).is_empty());
        assert!(decode_list(Some("")).is_empty());
        assert!(decode_list(Some("not json")).is_empty());
        assert!(decode_list(Some("{\"a\":1}")).is_empty());
    }

    #[test]
    fn test_save_and_get() {
        let db = Database::open_in_memory().unwrap();
        let rec = record("B08N5WRWNW");

        let saved = db.save(&rec).unwrap();
        assert!(saved.id > 0);
        assert_eq!(saved.asin, "B08N5WRWNW");
        assert_eq!(saved.original_title, rec.original.title);
        assert_eq!(saved.original_bullets, rec.original.bullet_points);
        assert_eq!(saved.optimized_bullets, rec.optimized.optimized_bullet_points);
        assert_eq!(saved.keywords, rec.optimized.keywords);

        let loaded = db.get(saved.id).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(db.get(saved.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_empty_lists_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut rec = record("B08N5WRWNW");
        rec.original.bullet_points.clear();
        rec.optimized = OptimizedListing::default();

        let saved = db.save(&rec).unwrap();
        assert!(saved.original_bullets.is_empty());
        assert!(saved.optimized_bullets.is_empty());
        assert!(saved.keywords.is_empty());
        assert_eq!(saved.optimized_title, "");
    }

    #[test]
    fn test_history_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db.save(&record("B08N5WRWNW")).unwrap();
        db.save(&record("B000000001")).unwrap();
        let second = db.save(&record("B08N5WRWNW")).unwrap();

        let asin = Asin::parse("B08N5WRWNW").unwrap();
        let history = db.history(&asin).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);

        assert_eq!(db.latest(&asin).unwrap().unwrap().id, second.id);
    }

    #[test]
    fn test_recent_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        for _ in 0..3 {
            db.save(&record("B08N5WRWNW")).unwrap();
        }
        assert_eq!(db.recent(2).unwrap().len(), 2);
        assert_eq!(db.recent(DEFAULT_RECENT_LIMIT).unwrap().len(), 3);
    }

    #[test]
    fn test_asin_exists() {
        let db = Database::open_in_memory().unwrap();
        let asin = Asin::parse("B08N5WRWNW").unwrap();
        assert!(!db.asin_exists(&asin).unwrap());
        assert!(db.latest(&asin).unwrap().is_none());

        db.save(&record("B08N5WRWNW")).unwrap();
        assert!(db.asin_exists(&asin).unwrap());
    }
}
