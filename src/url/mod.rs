//! URL handling module for Lot-Trawler
//!
//! This module builds the initial search URL, resolves relative links found on
//! results pages, and reads/rewrites the page-number query parameter.

mod resolve;
mod search;

// Re-export main functions
pub use resolve::{query_param, resolve_link, set_query_param};
pub use search::build_search_url;
