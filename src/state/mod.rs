//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: the lifecycle of a single page request
//! - `PageLifecycle`: enforces legal `PageState` transitions
//! - `CrawlState`: counters and identity set shared by all in-flight pages

mod crawl_state;
mod page_state;

// Re-export main types
pub use crawl_state::{CrawlGoal, CrawlSnapshot, CrawlState, PageCommit};
pub use page_state::{PageLifecycle, PageState};
