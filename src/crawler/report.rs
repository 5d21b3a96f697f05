//! End-of-run summary

use crate::listing::StrategyKind;
use crate::state::PageState;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// What happened to one page request
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub page_number: u32,

    /// Terminal lifecycle state
    pub state: PageState,

    /// Records handed to the sink and acknowledged
    pub saved: u32,

    pub duplicates: u32,
    pub unidentifiable: u32,

    /// Unique records dropped for lack of budget
    pub truncated: u32,

    pub blocked: bool,

    /// No strategy produced a record
    pub empty: bool,

    pub strategy: Option<StrategyKind>,
}

impl PageOutcome {
    pub(crate) fn failed(page_number: u32) -> Self {
        Self {
            page_number,
            state: PageState::Failed,
            saved: 0,
            duplicates: 0,
            unidentifiable: 0,
            truncated: 0,
            blocked: false,
            empty: false,
            strategy: None,
        }
    }
}

/// Totals for a whole crawl run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub saved_count: u32,
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub pages_blocked: u32,
    pub pages_empty: u32,
    pub duplicates_skipped: u32,
    pub unidentifiable_rejected: u32,
    pub truncated: u32,

    /// Saved records per winning strategy
    pub by_strategy: BTreeMap<String, u32>,

    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl CrawlReport {
    /// Folds one page's outcome into the totals
    pub fn record(&mut self, outcome: &PageOutcome) {
        if outcome.state == PageState::Failed {
            self.pages_failed += 1;
            return;
        }
        if outcome.blocked {
            self.pages_blocked += 1;
        }
        if outcome.empty {
            self.pages_empty += 1;
        }
        self.duplicates_skipped += outcome.duplicates;
        self.unidentifiable_rejected += outcome.unidentifiable;
        self.truncated += outcome.truncated;

        if let Some(strategy) = outcome.strategy {
            if outcome.saved > 0 {
                *self.by_strategy.entry(strategy.to_string()).or_default() += outcome.saved;
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "saved {} listings from {} pages in {:.1}s ({} failed, {} blocked, {} empty, {} duplicates, {} unidentifiable)",
            self.saved_count,
            self.pages_visited,
            self.elapsed.as_secs_f64(),
            self.pages_failed,
            self.pages_blocked,
            self.pages_empty,
            self.duplicates_skipped,
            self.unidentifiable_rejected
        )?;
        for (strategy, count) in &self.by_strategy {
            write!(f, "; {}={}", strategy, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(saved: u32, strategy: Option<StrategyKind>) -> PageOutcome {
        PageOutcome {
            page_number: 1,
            state: PageState::Done,
            saved,
            duplicates: 1,
            unidentifiable: 0,
            truncated: 0,
            blocked: false,
            empty: strategy.is_none(),
            strategy,
        }
    }

    #[test]
    fn test_record_accumulates() {
        let mut report = CrawlReport::default();
        report.record(&outcome(3, Some(StrategyKind::StructuredState)));
        report.record(&outcome(2, Some(StrategyKind::Markup)));
        report.record(&outcome(0, None));
        report.record(&PageOutcome::failed(4));

        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.pages_empty, 1);
        assert_eq!(report.duplicates_skipped, 3);
        assert_eq!(report.by_strategy.get("structured_state"), Some(&3));
        assert_eq!(report.by_strategy.get("markup"), Some(&2));
    }

    #[test]
    fn test_json_uses_millis() {
        let report = CrawlReport {
            elapsed: Duration::from_millis(1500),
            ..CrawlReport::default()
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"elapsed_ms\":1500"));
    }

    #[test]
    fn test_display() {
        let mut report = CrawlReport {
            saved_count: 7,
            pages_visited: 2,
            ..CrawlReport::default()
        };
        report.by_strategy.insert("structured_state".to_string(), 7);
        let text = report.to_string();
        assert!(text.starts_with("saved 7 listings from 2 pages"));
        assert!(text.ends_with("; structured_state=7"));
    }
}
