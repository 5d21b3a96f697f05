//! Anti-block classification
//!
//! A page is blocked if its content contains any configured indicator phrase,
//! ignoring case. The title is part of the content, so interstitial pages that
//! only announce themselves there are caught too.

use crate::listing::RawPage;

/// Classification of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockVerdict {
    Clean,

    /// The page matched `indicator`
    Blocked { indicator: String },
}

impl BlockVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Matches page content against block indicators
#[derive(Debug, Clone)]
pub struct BlockClassifier {
    /// Lower-cased indicator phrases
    indicators: Vec<String>,
}

impl BlockClassifier {
    pub fn new<S: AsRef<str>>(indicators: &[S]) -> Self {
        Self {
            indicators: indicators
                .iter()
                .map(|i| i.as_ref().trim().to_lowercase())
                .filter(|i| !i.is_empty())
                .collect(),
        }
    }

    /// Classifies a page; reports the first indicator that matched
    pub fn classify(&self, page: &RawPage) -> BlockVerdict {
        let content = page.content.to_lowercase();

        self.indicators
            .iter()
            .find(|indicator| content.contains(indicator.as_str()))
            .map(|indicator| BlockVerdict::Blocked {
                indicator: indicator.clone(),
            })
            .unwrap_or(BlockVerdict::Clean)
    }
}
