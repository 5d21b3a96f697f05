//! Crawl controller - main crawl orchestration logic
//!
//! The controller owns the frontier and the shared crawl state, and drives
//! every page through fetch → classify → extract → dedup → persist → paginate.
//! Up to `max_concurrency` pages are in flight at once; each runs as its own
//! task and reports a `PageOutcome` back to the loop.
//!
//! Termination only stops new dispatches. Pages already in flight finish
//! normally and are truncated to whatever budget is left.

use crate::config::{BlockPolicy, Config};
use crate::crawler::classifier::{BlockClassifier, BlockVerdict};
use crate::crawler::fetcher::Transport;
use crate::crawler::pagination::Paginator;
use crate::crawler::report::{CrawlReport, PageOutcome};
use crate::extract::{ExtractionOutcome, ExtractionPipeline};
use crate::listing::{PageRequest, RawPage};
use crate::output::{DebugCapture, ListingSink};
use crate::state::{CrawlGoal, CrawlState, PageLifecycle, PageState};
use crate::{ConfigError, TrawlError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Debug capture key for a page that produced no listings
pub fn no_data_key(page_number: u32) -> String {
    format!("debug_page_pg{}", page_number)
}

/// Debug capture key for a page that looked blocked
pub fn blocked_key(page_number: u32) -> String {
    format!("blocked_page_pg{}", page_number)
}

/// A page's outcome and the request that follows it, if any
type PageResult = (PageOutcome, Option<PageRequest>);

/// Everything a page task needs, shared across tasks
struct PageWorker {
    transport: Arc<dyn Transport>,
    pipeline: ExtractionPipeline,
    classifier: BlockClassifier,
    paginator: Paginator,
    sink: Arc<dyn ListingSink>,
    debug: Arc<dyn DebugCapture>,
    block_policy: BlockPolicy,
    state: CrawlState,
}

/// Drives a crawl run
pub struct Controller {
    worker: Arc<PageWorker>,
    max_concurrency: usize,
}

impl Controller {
    /// Builds a controller from the run configuration and its collaborators
    ///
    /// Fails only if the configured selectors or origin are invalid.
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ListingSink>,
        debug: Arc<dyn DebugCapture>,
    ) -> Result<Self, ConfigError> {
        let extraction = &config.extraction;

        let worker = PageWorker {
            transport,
            pipeline: ExtractionPipeline::from_config(extraction)?,
            classifier: BlockClassifier::new(&extraction.block_indicators),
            paginator: Paginator::from_config(extraction)?,
            sink,
            debug,
            block_policy: extraction.block_policy,
            state: CrawlState::new(CrawlGoal {
                results_wanted: config.limits.results_wanted,
                max_pages: config.limits.max_pages,
            }),
        };

        Ok(Self {
            worker: Arc::new(worker),
            max_concurrency: config.limits.max_concurrency.max(1) as usize,
        })
    }

    /// The run's shared state
    pub fn state(&self) -> &CrawlState {
        &self.worker.state
    }

    /// Runs the crawl from the given seed requests until the frontier drains
    pub async fn run(&self, seeds: impl IntoIterator<Item = PageRequest>) -> CrawlReport {
        let start_time = Instant::now();
        let goal = self.worker.state.goal();
        let mut frontier: VecDeque<PageRequest> = seeds.into_iter().collect();
        let mut in_flight: JoinSet<Result<PageResult, TrawlError>> = JoinSet::new();
        let mut report = CrawlReport::default();

        tracing::info!(
            "Starting crawl: {} seed(s), want {} listings, at most {} pages, {} concurrent",
            frontier.len(),
            goal.results_wanted,
            goal.max_pages,
            self.max_concurrency
        );

        loop {
            // Dispatch while there is capacity
            while in_flight.len() < self.max_concurrency {
                let Some(request) = frontier.pop_front() else {
                    break;
                };

                if !self.worker.state.try_reserve_page() {
                    tracing::debug!(
                        "Not dispatching page {}: budget met or page cap reached",
                        request.page_number
                    );
                    frontier.clear();
                    break;
                }

                let worker = Arc::clone(&self.worker);
                in_flight.spawn(async move { worker.process(request).await });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok(Ok((outcome, next))) => {
                    report.record(&outcome);
                    if let Some(next) = next {
                        tracing::debug!("Enqueued page {}: {}", next.page_number, next.url);
                        frontier.push_back(next);
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!("Page task failed: {}", e);
                    report.pages_failed += 1;
                }
                Err(e) => {
                    tracing::error!("Page task panicked: {}", e);
                    report.pages_failed += 1;
                }
            }
        }

        let snapshot = self.worker.state.snapshot();
        report.saved_count = snapshot.saved_count;
        report.pages_visited = snapshot.pages_visited;
        report.elapsed = start_time.elapsed();

        tracing::info!(
            "Crawl finished: {} ({} distinct listings seen)",
            report,
            self.worker.state.seen_keys()
        );
        report
    }
}

impl PageWorker {
    /// Runs one page through its whole lifecycle
    async fn process(self: Arc<Self>, request: PageRequest) -> Result<PageResult, TrawlError> {
        let mut lifecycle = PageLifecycle::new(request.page_number);

        lifecycle.advance(PageState::Fetching)?;
        let page = match self.transport.fetch(&request).await {
            Ok(page) => {
                lifecycle.advance(PageState::Fetched)?;
                page
            }
            Err(e) => {
                tracing::warn!("Page {} failed: {}", request.page_number, TrawlError::from(e));
                lifecycle.advance(PageState::FetchFailed)?;
                lifecycle.advance(PageState::Failed)?;
                return Ok((PageOutcome::failed(request.page_number), None));
            }
        };

        // Everything past the fetch is synchronous
        self.handle_page(&request, &page, &mut lifecycle)
    }

    /// Classify, extract, commit, persist and paginate a fetched page
    fn handle_page(
        &self,
        request: &PageRequest,
        page: &RawPage,
        lifecycle: &mut PageLifecycle,
    ) -> Result<PageResult, TrawlError> {
        let page_number = request.page_number;

        lifecycle.advance(PageState::Classifying)?;
        let verdict = self.classifier.classify(page);
        let blocked = verdict.is_blocked();
        if let BlockVerdict::Blocked { indicator } = verdict {
            tracing::warn!(
                "{}",
                TrawlError::Blocked {
                    url: request.url.clone(),
                    indicator,
                }
            );
            self.debug.store(&blocked_key(page_number), &page.content);
        }

        lifecycle.advance(PageState::Extracting)?;
        let extraction = if blocked && self.block_policy == BlockPolicy::Skip {
            tracing::info!("Skipping extraction of blocked page {}", page_number);
            ExtractionOutcome {
                empty: true,
                ..ExtractionOutcome::default()
            }
        } else {
            self.pipeline.extract(page)
        };

        if extraction.empty && !blocked {
            tracing::warn!(
                "{} [{}]",
                TrawlError::NoData {
                    url: request.url.clone(),
                    page_number,
                },
                extraction.reason()
            );
            self.debug.store(&no_data_key(page_number), &page.content);
        }

        lifecycle.advance(PageState::Deduping)?;
        let empty = extraction.empty;
        let strategy = extraction.strategy_used;
        let commit = self.state.commit_page(extraction.records);

        lifecycle.advance(PageState::Persisted)?;
        let mut saved = commit.records.len() as u32;
        if saved > 0 {
            if let Err(e) = self.sink.append(page_number, &commit.records) {
                tracing::error!(
                    "Failed to persist {} listings from page {}: {}",
                    saved,
                    page_number,
                    e
                );
                self.state.release_budget(saved);
                saved = 0;
            }
        }

        let snapshot = self.state.snapshot();
        tracing::info!(
            "Page {}: saved {} ({} duplicates, {} truncated), {}/{} listings total",
            page_number,
            saved,
            commit.duplicates,
            commit.truncated,
            snapshot.saved_count,
            snapshot.goal.results_wanted
        );

        let next = self.paginator.next_request(page, request, &snapshot);
        lifecycle.advance(if next.is_some() {
            PageState::NextEnqueued
        } else {
            PageState::Done
        })?;

        let outcome = PageOutcome {
            page_number,
            state: lifecycle.state(),
            saved,
            duplicates: commit.duplicates,
            unidentifiable: commit.unidentifiable,
            truncated: commit.truncated,
            blocked,
            empty,
            strategy,
        };
        Ok((outcome, next))
    }
}
