/// Page state definitions for tracking a results page through the pipeline
///
/// Every `PageRequest` walks this state machine exactly once:
///
/// ```text
/// Pending -> Fetching -> Fetched -> Classifying -> Extracting -> Deduping
///                    \                                              |
///                     -> FetchFailed -> Failed                  Persisted
///                                                               /      \
///                                                     NextEnqueued    Done
/// ```
use crate::TrawlError;
use std::fmt;

/// Represents the current state of a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Request is in the frontier
    Pending,

    /// Transport is fetching the page
    Fetching,

    /// Transport returned content
    Fetched,

    /// Transport gave up on the page
    FetchFailed,

    /// Block classifier is inspecting the content
    Classifying,

    /// Extraction pipeline is running
    Extracting,

    /// Candidates are being deduplicated and truncated to the budget
    Deduping,

    /// Accepted records were handed to the sink
    Persisted,

    // ===== Terminal States =====
    /// A follow-up page request was enqueued
    NextEnqueued,

    /// No follow-up page (budget met, page cap hit, or no next page)
    Done,

    /// Fetch retries exhausted
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NextEnqueued | Self::Done | Self::Failed)
    }

    /// Returns true if the page completed without a fetch failure
    pub fn is_success(&self) -> bool {
        matches!(self, Self::NextEnqueued | Self::Done)
    }

    /// Returns true if `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Fetching, Fetched)
                | (Fetching, FetchFailed)
                | (FetchFailed, Failed)
                | (Fetched, Classifying)
                | (Classifying, Extracting)
                | (Extracting, Deduping)
                | (Deduping, Persisted)
                | (Persisted, NextEnqueued)
                | (Persisted, Done)
        )
    }

    /// Converts the page state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::FetchFailed => "fetch_failed",
            Self::Classifying => "classifying",
            Self::Extracting => "extracting",
            Self::Deduping => "deduping",
            Self::Persisted => "persisted",
            Self::NextEnqueued => "next_enqueued",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a page state from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "fetching" => Some(Self::Fetching),
            "fetched" => Some(Self::Fetched),
            "fetch_failed" => Some(Self::FetchFailed),
            "classifying" => Some(Self::Classifying),
            "extracting" => Some(Self::Extracting),
            "deduping" => Some(Self::Deduping),
            "persisted" => Some(Self::Persisted),
            "next_enqueued" => Some(Self::NextEnqueued),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Fetched,
            Self::FetchFailed,
            Self::Classifying,
            Self::Extracting,
            Self::Deduping,
            Self::Persisted,
            Self::NextEnqueued,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Tracks one request through the state machine, rejecting illegal moves
#[derive(Debug)]
pub struct PageLifecycle {
    page_number: u32,
    state: PageState,
}

impl PageLifecycle {
    pub fn new(page_number: u32) -> Self {
        Self {
            page_number,
            state: PageState::Pending,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Moves to `next`, or fails with `InvalidTransition`
    pub fn advance(&mut self, next: PageState) -> Result<(), TrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(TrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Page {}: {} -> {}", self.page_number, self.state, next);
        self.state = next;
        Ok(())
    }
}
