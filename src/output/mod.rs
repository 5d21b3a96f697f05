//! Output module for listings and diagnostics
//!
//! This module handles:
//! - Persisting listings to SQLite and, optionally, JSON Lines
//! - Capturing raw pages that were blocked or produced no listings
//! - Loading and printing listing statistics

mod debug;
mod jsonl;
mod sqlite_output;
pub mod stats;
mod traits;

pub use debug::FsDebugCapture;
pub use jsonl::{FanOutSink, JsonLinesSink};
pub use sqlite_output::{SharedStorage, SqliteListingSink};
pub use stats::{load_statistics, print_statistics, ListingStatistics};
pub use traits::{DebugCapture, ListingSink, NoDebugCapture, OutputError, OutputResult};

use crate::config::OutputConfig;
use std::path::Path;

/// Builds the run's listing sink from the output configuration
///
/// SQLite is always written; a JSON Lines file is added when configured.
pub fn build_sink(
    config: &OutputConfig,
    storage: SharedStorage,
    run_id: i64,
) -> OutputResult<Box<dyn ListingSink>> {
    let sqlite: Box<dyn ListingSink> = Box::new(SqliteListingSink::new(storage, run_id));

    match &config.jsonl_path {
        Some(path) => {
            tracing::info!("Also exporting listings to {}", path);
            let jsonl = JsonLinesSink::open(Path::new(path))?;
            Ok(Box::new(FanOutSink::new(vec![sqlite, Box::new(jsonl)])))
        }
        None => Ok(sqlite),
    }
}
