//! Statistics generation from the listings database
//!
//! This module provides functionality for extracting and displaying
//! listing statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Listing statistics summary
#[derive(Debug, Clone)]
pub struct ListingStatistics {
    /// Number of recorded runs
    pub total_runs: u64,

    /// Listings across all runs
    pub total_listings: u64,

    /// Distinct VINs across all runs
    pub distinct_vins: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Listings saved by the most recent run
    pub latest_run_listings: u64,

    /// Listing counts per extraction strategy, largest first
    pub by_strategy: Vec<(String, u64)>,

    /// Listing counts per make, largest first
    pub by_make: Vec<(String, u64)>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<ListingStatistics> {
    let latest_run = storage.get_latest_run()?;
    let latest_run_listings = match &latest_run {
        Some(run) => storage.count_listings(Some(run.id))?,
        None => 0,
    };

    Ok(ListingStatistics {
        total_runs: storage.count_runs()?,
        total_listings: storage.count_listings(None)?,
        distinct_vins: storage.count_distinct_vins()?,
        latest_run,
        latest_run_listings,
        by_strategy: storage.count_by_strategy()?,
        by_make: storage.count_by_make()?,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ListingStatistics) {
    println!("=== Listing Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Listings stored: {}", stats.total_listings);
    println!("  Distinct VINs: {}", stats.distinct_vins);
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Listings saved: {}", stats.latest_run_listings);
        println!("  Pages visited: {}", run.pages_visited);
        println!();
    }

    if !stats.by_strategy.is_empty() {
        println!("Listings by Strategy:");
        for (strategy, count) in &stats.by_strategy {
            println!(
                "  {}: {} ({:.1}%)",
                strategy,
                count,
                percentage(*count, stats.total_listings)
            );
        }
        println!();
    }

    if !stats.by_make.is_empty() {
        println!("Listings by Make:");
        for (make, count) in &stats.by_make {
            println!("  {}: {}", make, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{ListingRecord, StrategyKind};
    use crate::storage::SqliteStorage;

    #[test]
    fn test_empty_database() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_runs, 0);
        assert_eq!(stats.total_listings, 0);
        assert!(stats.latest_run.is_none());
        assert!(stats.by_make.is_empty());
    }

    #[test]
    fn test_statistics_reflect_latest_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let old_run = storage.create_run("h").unwrap();
        let new_run = storage.create_run("h").unwrap();

        let mut a = ListingRecord::new("Chevrolet", "Malibu", StrategyKind::StructuredState);
        a.vin = Some("A".to_string());
        let mut b = ListingRecord::new("Ford", "Focus", StrategyKind::Markup);
        b.url = Some("https://example.com/b".to_string());

        storage.insert_listings(old_run, 1, &[a.clone()]).unwrap();
        storage.insert_listings(new_run, 1, &[a, b]).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.total_listings, 3);
        assert_eq!(stats.distinct_vins, 1);
        assert_eq!(stats.latest_run.as_ref().map(|r| r.id), Some(new_run));
        assert_eq!(stats.latest_run_listings, 2);
        assert_eq!(stats.by_make[0], ("Chevrolet".to_string(), 2));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 0), 0.0);
        assert!((percentage(1, 4) - 25.0).abs() < 0.01);
    }
}
