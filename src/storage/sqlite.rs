//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::IdentityKey;
use crate::listing::{ListingRecord, StrategyKind};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RunTotals, Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, saved_count, pages_visited, report";

const LISTING_COLUMNS: &str = "listing_id, vin, year, make, model, trim, style, price, mileage,
     location, exterior_color, interior_color, fuel_type, transmission, engine, condition, url,
     strategy";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count_grouped(&self, column: &str) -> StorageResult<Vec<(String, u64)>> {
        let query = format!(
            "SELECT {column}, COUNT(*) AS n FROM listings GROUP BY {column} ORDER BY n DESC, {column}"
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        saved_count: row.get(5)?,
        pages_visited: row.get(6)?,
        report: row.get(7)?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRecord> {
    let strategy: String = row.get(17)?;
    Ok(ListingRecord {
        listing_id: row.get(0)?,
        vin: row.get(1)?,
        year: row.get(2)?,
        make: row.get(3)?,
        model: row.get(4)?,
        trim: row.get(5)?,
        style: row.get(6)?,
        price: row.get::<_, Option<i64>>(7)?.and_then(|p| u64::try_from(p).ok()),
        mileage: row.get::<_, Option<i64>>(8)?.and_then(|m| u64::try_from(m).ok()),
        location: row.get(9)?,
        exterior_color: row.get(10)?,
        interior_color: row.get(11)?,
        fuel_type: row.get(12)?,
        transmission: row.get(13)?,
        engine: row.get(14)?,
        condition: row.get(15)?,
        url: row.get(16)?,
        strategy_used: StrategyKind::from_db_string(&strategy).unwrap_or(StrategyKind::Markup),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE id = ?1"),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs ORDER BY id DESC LIMIT 1"),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, saved_count = ?3,
             pages_visited = ?4, report = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                totals.saved_count,
                totals.pages_visited,
                totals.report,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Listings =====

    fn insert_listings(
        &mut self,
        run_id: i64,
        page_number: u32,
        records: &[ListingRecord],
    ) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO listings (
                    run_id, identity_key, page_number, strategy, listing_id, vin, year, make,
                    model, trim, style, price, mileage, location, exterior_color,
                    interior_color, fuel_type, transmission, engine, condition, url, scraped_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                          ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            )?;

            for r in records {
                let key = IdentityKey::for_record(r).ok_or_else(|| {
                    StorageError::Unidentifiable(format!("{} {}", r.make, r.model))
                })?;

                inserted += stmt.execute(params![
                    run_id,
                    key.to_string(),
                    page_number,
                    r.strategy_used.to_db_string(),
                    r.listing_id,
                    r.vin,
                    r.year,
                    r.make,
                    r.model,
                    r.trim,
                    r.style,
                    r.price.and_then(|p| i64::try_from(p).ok()),
                    r.mileage.and_then(|m| i64::try_from(m).ok()),
                    r.location,
                    r.exterior_color,
                    r.interior_color,
                    r.fuel_type,
                    r.transmission,
                    r.engine,
                    r.condition,
                    r.url,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn get_listings(&self, run_id: i64) -> StorageResult<Vec<ListingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE run_id = ?1 ORDER BY id"
        ))?;
        let listings = stmt
            .query_map(params![run_id], listing_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(listings)
    }

    // ===== Statistics =====

    fn count_listings(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = match run_id {
            Some(id) => self.conn.query_row(
                "SELECT COUNT(*) FROM listings WHERE run_id = ?1",
                params![id],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn count_distinct_vins(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT UPPER(vin)) FROM listings WHERE vin IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_strategy(&self) -> StorageResult<Vec<(String, u64)>> {
        self.count_grouped("strategy")
    }

    fn count_by_make(&self) -> StorageResult<Vec<(String, u64)>> {
        self.count_grouped("make")
    }
}
