//! Listing extraction
//!
//! Extraction is a list of interchangeable strategies tried in priority order:
//!
//! 1. `StructuredStateExtractor` decodes the JSON state payload embedded in the page
//! 2. `MarkupExtractor` scans the rendered markup for listing cards
//!
//! The first strategy to return at least one record wins the page. A strategy
//! that fails to parse is treated the same as one that finds nothing: the
//! pipeline moves on and notes why.

mod markup;
mod structured;

pub use markup::MarkupExtractor;
pub use structured::StructuredStateExtractor;

use crate::config::ExtractionConfig;
use crate::listing::{ListingRecord, RawPage, StrategyKind};
use crate::ConfigError;
use scraper::Selector;
use thiserror::Error;

/// Recoverable failure of a single strategy
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no element matches state anchor '{anchor}'")]
    MissingAnchor { anchor: String },

    #[error("state anchor '{anchor}' is empty")]
    EmptyPayload { anchor: String },

    #[error("malformed state payload: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// Parses a CSS selector, reporting failures as configuration errors
pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// A way of turning a raw page into listing records
pub trait ExtractionStrategy: Send + Sync {
    /// Identifies the strategy on produced records and in diagnostics
    fn kind(&self) -> StrategyKind;

    /// Extracts every listing on the page
    ///
    /// Returns an empty vector if the page is well-formed but has no listings.
    fn extract(&self, page: &RawPage) -> Result<Vec<ListingRecord>, ParseError>;
}

/// Why a strategy did not win a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDiagnostic {
    pub strategy: StrategyKind,
    pub reason: String,
}

/// Result of running the pipeline over one page
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    /// Records of the winning strategy, in page order
    pub records: Vec<ListingRecord>,

    /// The winning strategy, if any produced records
    pub strategy_used: Option<StrategyKind>,

    /// True if no strategy produced a record
    pub empty: bool,

    /// One entry per strategy that was tried and came up empty
    pub diagnostics: Vec<StrategyDiagnostic>,
}

impl ExtractionOutcome {
    /// Human-readable summary of why the page produced nothing
    pub fn reason(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| format!("{}: {}", d.strategy, d.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Runs strategies in order until one yields records
pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Builds the standard structured-state → markup pipeline
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(vec![
            Box::new(StructuredStateExtractor::new(&config.structured)?),
            Box::new(MarkupExtractor::new(&config.markup, &config.site_origin)?),
        ]))
    }

    /// Extracts listings from a page
    ///
    /// Never fails: parse errors are downgraded to diagnostics and the next
    /// strategy is tried.
    pub fn extract(&self, page: &RawPage) -> ExtractionOutcome {
        let mut diagnostics = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.extract(page) {
                Ok(records) if !records.is_empty() => {
                    tracing::info!(
                        "Extracted {} listings via {} from {}",
                        records.len(),
                        kind,
                        page.source_url
                    );
                    return ExtractionOutcome {
                        records,
                        strategy_used: Some(kind),
                        empty: false,
                        diagnostics,
                    };
                }
                Ok(_) => {
                    tracing::debug!("{} found no listings on {}", kind, page.source_url);
                    diagnostics.push(StrategyDiagnostic {
                        strategy: kind,
                        reason: "no listings found".to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("{} failed on {}: {}", kind, page.source_url, e);
                    diagnostics.push(StrategyDiagnostic {
                        strategy: kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        ExtractionOutcome {
            records: Vec::new(),
            strategy_used: None,
            empty: true,
            diagnostics,
        }
    }
}
