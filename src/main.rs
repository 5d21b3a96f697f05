//! Lot-Trawler main entry point
//!
//! This is the command-line interface for the Lot-Trawler listings crawler.

use anyhow::Context;
use clap::Parser;
use lot_trawler::config::{compute_config_hash, read_config, validate, Config};
use lot_trawler::crawler::crawl;
use lot_trawler::url::build_search_url;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lot-Trawler: a resilient vehicle-listing crawler
///
/// Lot-Trawler walks paginated search results, extracts listings from
/// embedded page state or from card markup, and stops once the requested
/// number of unique listings has been saved.
#[derive(Parser, Debug)]
#[command(name = "lot-trawler")]
#[command(version = "1.0.0")]
#[command(about = "A resilient vehicle-listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the start URL without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Explicit first results page
    #[arg(long)]
    start_url: Option<String>,

    #[arg(long)]
    make: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    year_min: Option<u32>,

    #[arg(long)]
    year_max: Option<u32>,

    #[arg(long)]
    zip: Option<String>,

    /// Number of unique listings to save
    #[arg(long)]
    results_wanted: Option<u32>,

    /// Maximum number of results pages to request
    #[arg(long)]
    max_pages: Option<u32>,
}

impl Cli {
    /// Copies command-line overrides onto the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(start_url) = &self.start_url {
            config.search.start_url = Some(start_url.clone());
        }
        if let Some(make) = &self.make {
            config.search.make = Some(make.clone());
        }
        if let Some(model) = &self.model {
            config.search.model = Some(model.clone());
        }
        if self.year_min.is_some() {
            config.search.year_min = self.year_min;
        }
        if self.year_max.is_some() {
            config.search.year_max = self.year_max;
        }
        if let Some(zip) = &self.zip {
            config.search.zip = Some(zip.clone());
        }
        if let Some(results_wanted) = self.results_wanted {
            config.limits.results_wanted = results_wanted;
        }
        if let Some(max_pages) = self.max_pages {
            config.limits.max_pages = max_pages;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = read_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;
    let config_hash = compute_config_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lot_trawler=info,warn"),
            1 => EnvFilter::new("lot_trawler=debug,info"),
            2 => EnvFilter::new("lot_trawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let start_url = build_search_url(&config.search).context("Cannot build search URL")?;

    println!("=== Lot-Trawler Dry Run ===\n");

    println!("Search:");
    println!("  Start URL: {}", start_url);
    println!("  Make: {}", config.search.make.as_deref().unwrap_or("-"));
    println!("  Model: {}", config.search.model.as_deref().unwrap_or("-"));

    println!("\nLimits:");
    println!("  Results wanted: {}", config.limits.results_wanted);
    println!("  Max pages: {}", config.limits.max_pages);
    println!("  Max concurrency: {}", config.limits.max_concurrency);

    println!("\nTransport:");
    println!("  Timeout: {}s", config.transport.timeout_secs);
    println!(
        "  Retries: {} (base delay {}ms)",
        config.transport.max_retries, config.transport.retry_delay_ms
    );
    println!("  Proxies: {}", config.transport.proxy_urls.len());
    println!("  User agents: {}", config.transport.user_agents.len());

    println!("\nExtraction:");
    println!("  Site origin: {}", config.extraction.site_origin);
    println!("  Block policy: {:?}", config.extraction.block_policy);
    println!(
        "  Block indicators: {}",
        config.extraction.block_indicators.join(", ")
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(path) = &config.output.jsonl_path {
        println!("  JSON Lines: {}", path);
    }
    println!("  Debug captures: {}", config.output.debug_dir);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use lot_trawler::output::{load_statistics, print_statistics};
    use lot_trawler::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling for {} listings across at most {} pages",
        config.limits.results_wanted,
        config.limits.max_pages
    );

    match crawl(config, config_hash).await {
        Ok(report) => {
            tracing::info!("Crawl completed: {}", report);
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
