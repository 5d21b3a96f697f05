//! Configuration module for Lot-Trawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so an empty file describes the default search.
//!
//! # Example
//!
//! ```no_run
//! use lot_trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Will save up to {} listings", config.limits.results_wanted);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BlockPolicy, Config, ExtractionConfig, LimitsConfig, MarkupConfig, OutputConfig,
    SearchConfig, StructuredConfig, TransportConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, read_config};
pub use validation::validate;
