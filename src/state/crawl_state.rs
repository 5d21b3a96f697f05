use crate::crawler::{Admission, Deduplicator};
use crate::listing::ListingRecord;
use std::sync::{Mutex, MutexGuard};

/// The budget a run works towards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlGoal {
    /// Maximum number of listings to persist
    pub results_wanted: u32,

    /// Maximum number of results pages to request
    pub max_pages: u32,
}

/// Point-in-time view of the crawl state
///
/// This is what the pagination resolver decides on; it never sees the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSnapshot {
    pub saved_count: u32,
    pub pages_visited: u32,
    pub pages_requested: u32,
    pub goal: CrawlGoal,
}

impl CrawlSnapshot {
    /// Returns true once the results budget is met
    pub fn budget_met(&self) -> bool {
        self.saved_count >= self.goal.results_wanted
    }

    /// Returns true once the page cap is reached
    pub fn page_cap_reached(&self) -> bool {
        self.pages_visited >= self.goal.max_pages
    }

    /// Returns true if no further page should be requested
    pub fn is_terminal(&self) -> bool {
        self.budget_met() || self.page_cap_reached()
    }

    /// Listings that may still be persisted
    pub fn remaining(&self) -> u32 {
        self.goal.results_wanted.saturating_sub(self.saved_count)
    }
}

/// What one page contributed once deduplicated and truncated
#[derive(Debug, Clone)]
pub struct PageCommit {
    /// Records to persist, in extraction order
    pub records: Vec<ListingRecord>,

    /// Candidates whose identity key was already seen
    pub duplicates: u32,

    /// Candidates with no identity key
    pub unidentifiable: u32,

    /// Unique candidates dropped because the budget ran out
    pub truncated: u32,
}

#[derive(Debug)]
struct Inner {
    saved_count: u32,
    pages_visited: u32,
    pages_requested: u32,
    dedup: Deduplicator,
}

/// Shared state of one crawl run
///
/// All counters and the identity set live behind a single lock, so the
/// check-and-reserve operations below are atomic with respect to other
/// concurrently completing pages.
#[derive(Debug)]
pub struct CrawlState {
    goal: CrawlGoal,
    inner: Mutex<Inner>,
}

impl CrawlState {
    pub fn new(goal: CrawlGoal) -> Self {
        Self {
            goal,
            inner: Mutex::new(Inner {
                saved_count: 0,
                pages_visited: 0,
                pages_requested: 0,
                dedup: Deduplicator::new(),
            }),
        }
    }

    pub fn goal(&self) -> CrawlGoal {
        self.goal
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay consistent even if a holder panicked mid-update
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserves a page slot before a request is dispatched
    ///
    /// Returns false (and reserves nothing) once the page cap has been handed
    /// out or the results budget is met.
    pub fn try_reserve_page(&self) -> bool {
        let mut inner = self.lock();
        if inner.saved_count >= self.goal.results_wanted
            || inner.pages_requested >= self.goal.max_pages
        {
            return false;
        }
        inner.pages_requested += 1;
        true
    }

    /// Deduplicates a page's candidates and reserves budget for the survivors
    ///
    /// Under one lock: every candidate is offered to the deduplicator in order,
    /// the accepted ones are truncated to the remaining budget, `saved_count`
    /// grows by the number kept and the page counts as visited.
    pub fn commit_page(&self, candidates: Vec<ListingRecord>) -> PageCommit {
        let mut inner = self.lock();

        let mut records = Vec::with_capacity(candidates.len());
        let mut duplicates = 0;
        let mut unidentifiable = 0;

        for record in candidates {
            match inner.dedup.admit(&record) {
                Admission::Accepted(_) => records.push(record),
                Admission::Duplicate(key) => {
                    tracing::debug!("Skipping duplicate listing {}", key);
                    duplicates += 1;
                }
                Admission::Unidentifiable => unidentifiable += 1,
            }
        }

        let remaining = self.goal.results_wanted.saturating_sub(inner.saved_count) as usize;
        let truncated = records.len().saturating_sub(remaining) as u32;
        records.truncate(remaining);

        inner.saved_count += records.len() as u32;
        inner.pages_visited += 1;

        PageCommit {
            records,
            duplicates,
            unidentifiable,
            truncated,
        }
    }

    /// Gives back budget reserved for records the sink failed to store
    pub fn release_budget(&self, count: u32) {
        let mut inner = self.lock();
        inner.saved_count = inner.saved_count.saturating_sub(count);
    }

    pub fn snapshot(&self) -> CrawlSnapshot {
        let inner = self.lock();
        CrawlSnapshot {
            saved_count: inner.saved_count,
            pages_visited: inner.pages_visited,
            pages_requested: inner.pages_requested,
            goal: self.goal,
        }
    }

    /// Number of distinct identity keys seen this run
    pub fn seen_keys(&self) -> usize {
        self.lock().dedup.len()
    }
}
