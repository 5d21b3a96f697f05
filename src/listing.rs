//! Core data types that flow through a crawl
//!
//! - `PageRequest`: one results page to fetch
//! - `RawPage`: what the transport returned for a request
//! - `ListingRecord`: one extracted vehicle listing
//! - `StrategyKind`: which extraction strategy produced a record

use serde::{Deserialize, Serialize};
use std::fmt;

/// A results page scheduled for fetching
///
/// Created by the initial seed or by the pagination resolver, consumed exactly
/// once by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL of the page
    pub url: String,

    /// 1-based page number within the results
    pub page_number: u32,

    /// Retries already spent on this request
    pub retry_count: u32,
}

impl PageRequest {
    /// Creates the first request of a crawl
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page_number: 1,
            retry_count: 0,
        }
    }

    /// Creates the request that follows `self`, pointing at `url`
    pub fn next(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page_number: self.page_number.saturating_add(1),
            retry_count: 0,
        }
    }
}

/// Page content returned by the transport
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Markup or rendered DOM snapshot
    pub content: String,

    /// HTTP status code of the final response
    pub status_code: u16,

    /// URL the content was served from (after redirects)
    pub source_url: String,
}

impl RawPage {
    pub fn new(content: impl Into<String>, status_code: u16, source_url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status_code,
            source_url: source_url.into(),
        }
    }
}

/// Identifies the extraction strategy that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Decoded from the embedded JSON state payload
    StructuredState,

    /// Scraped from listing cards in the markup
    Markup,
}

impl StrategyKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::StructuredState => "structured_state",
            Self::Markup => "markup",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "structured_state" => Some(Self::StructuredState),
            "markup" => Some(Self::Markup),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A single vehicle listing
///
/// All fields of a record come from one strategy; records are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub listing_id: Option<String>,
    pub vin: Option<String>,
    pub year: Option<u32>,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    pub style: Option<String>,
    pub price: Option<u64>,
    pub mileage: Option<u64>,
    pub location: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub engine: Option<String>,
    pub condition: Option<String>,
    pub url: Option<String>,
    pub strategy_used: StrategyKind,
}

impl ListingRecord {
    /// Creates a record with only the required fields set
    pub fn new(make: impl Into<String>, model: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            listing_id: None,
            vin: None,
            year: None,
            make: make.into(),
            model: model.into(),
            trim: None,
            style: None,
            price: None,
            mileage: None,
            location: None,
            exterior_color: None,
            interior_color: None,
            fuel_type: None,
            transmission: None,
            engine: None,
            condition: None,
            url: None,
            strategy_used: strategy,
        }
    }
}
