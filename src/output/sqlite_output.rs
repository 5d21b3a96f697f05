//! SQLite-based listing sink
//!
//! Records each page's listings directly into the storage backend under the
//! current run.

use crate::listing::ListingRecord;
use crate::output::traits::{ListingSink, OutputError, OutputResult};
use crate::storage::Storage;
use std::sync::{Arc, Mutex};

/// Shared handle to a storage backend
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// SQLite-based listing sink
pub struct SqliteListingSink {
    storage: SharedStorage,
    run_id: i64,
}

impl SqliteListingSink {
    pub fn new(storage: SharedStorage, run_id: i64) -> Self {
        Self { storage, run_id }
    }
}

impl ListingSink for SqliteListingSink {
    fn append(&self, page_number: u32, records: &[ListingRecord]) -> OutputResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut storage = self
            .storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))?;

        let inserted = storage
            .insert_listings(self.run_id, page_number, records)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        if inserted < records.len() {
            tracing::debug!(
                "{} of {} listings from page {} were already stored",
                records.len() - inserted,
                records.len(),
                page_number
            );
        }

        Ok(inserted)
    }
}
