//! Crawler module for results-page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry, header and proxy rotation
//! - Anti-block classification of fetched pages
//! - Identity-based deduplication of listings
//! - Pagination resolution
//! - Overall crawl coordination

mod classifier;
mod controller;
mod dedup;
mod fetcher;
mod pagination;
mod report;

pub use classifier::{BlockClassifier, BlockVerdict};
pub use controller::{blocked_key, no_data_key, Controller};
pub use dedup::{Admission, Deduplicator, IdentityKey};
pub use fetcher::{build_http_client, HttpTransport, Transport};
pub use pagination::Paginator;
pub use report::{CrawlReport, PageOutcome};

use crate::config::Config;
use crate::listing::PageRequest;
use crate::output::{build_sink, DebugCapture, FsDebugCapture, NoDebugCapture, SharedStorage};
use crate::storage::{open_storage, RunStatus, RunTotals, Storage};
use crate::url::build_search_url;
use crate::TrawlError;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the storage layer and record a new run
/// 2. Build the HTTP transport, sink and debug capture
/// 3. Crawl from the search URL until the budget or page cap is reached
/// 4. Record the run's totals
pub async fn crawl(config: Config, config_hash: &str) -> Result<CrawlReport, TrawlError> {
    let start_url = build_search_url(&config.search)?;

    let mut storage = open_storage(Path::new(&config.output.database_path))?;
    let run_id = storage.create_run(config_hash)?;
    let storage: SharedStorage = Arc::new(Mutex::new(storage));
    tracing::info!("Starting run {} at {}", run_id, start_url);

    let transport = HttpTransport::new(&config.transport)?;
    let sink = build_sink(&config.output, Arc::clone(&storage), run_id)?;
    let debug: Arc<dyn DebugCapture> = if config.output.debug_dir.trim().is_empty() {
        Arc::new(NoDebugCapture)
    } else {
        Arc::new(FsDebugCapture::new(&config.output.debug_dir))
    };

    let controller = Controller::new(&config, Arc::new(transport), Arc::from(sink), debug)?;
    let report = controller.run([PageRequest::seed(start_url.as_str())]).await;

    let totals = RunTotals {
        saved_count: report.saved_count,
        pages_visited: report.pages_visited,
        report: Some(report.to_json().map_err(crate::output::OutputError::from)?),
    };
    let status = if report.pages_visited == 0 && report.pages_failed > 0 {
        RunStatus::Failed
    } else {
        RunStatus::Completed
    };

    storage
        .lock()
        .map_err(|e| crate::storage::StorageError::Database(format!("Failed to lock storage: {}", e)))?
        .complete_run(run_id, status, &totals)?;

    Ok(report)
}
