//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::listing::ListingRecord;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Listing has no identity key: {0}")]
    Unidentifiable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Final figures written onto a run row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTotals {
    pub saved_count: u32,
    pub pages_visited: u32,

    /// Serialized crawl report
    pub report: Option<String>,
}

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by a crawl run and by
/// the statistics output.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run, returning its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with its final status and totals
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()>;

    /// Counts all runs
    fn count_runs(&self) -> StorageResult<u64>;

    // ===== Listings =====

    /// Inserts a page's listings in one transaction, in order
    ///
    /// Listings whose identity key is already stored for the run are ignored.
    /// Returns the number of rows actually inserted.
    fn insert_listings(
        &mut self,
        run_id: i64,
        page_number: u32,
        records: &[ListingRecord],
    ) -> StorageResult<usize>;

    /// Gets a run's listings in insertion order
    fn get_listings(&self, run_id: i64) -> StorageResult<Vec<ListingRecord>>;

    // ===== Statistics =====

    /// Counts listings, across all runs if `run_id` is None
    fn count_listings(&self, run_id: Option<i64>) -> StorageResult<u64>;

    /// Counts listings with a VIN, across all runs
    fn count_distinct_vins(&self) -> StorageResult<u64>;

    /// Listing counts per extraction strategy, largest first
    fn count_by_strategy(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Listing counts per make, largest first
    fn count_by_make(&self) -> StorageResult<Vec<(String, u64)>>;
}
