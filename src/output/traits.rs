//! Output collaborator traits and types
//!
//! The controller hands finished work to two narrow interfaces:
//! - `ListingSink` receives each page's surviving records
//! - `DebugCapture` receives raw pages worth looking at later

use crate::listing::ListingRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for persisted listings
///
/// Implementations must be thread-safe; pages complete concurrently.
pub trait ListingSink: Send + Sync {
    /// Appends one page's records, preserving their order
    ///
    /// An empty slice is a no-op. Returns how many records were written.
    fn append(&self, page_number: u32, records: &[ListingRecord]) -> OutputResult<usize>;
}

/// Store for raw pages that produced nothing or looked blocked
///
/// Fire-and-forget: failures are the implementation's to log.
pub trait DebugCapture: Send + Sync {
    fn store(&self, key: &str, content: &str);
}

/// Debug capture that keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDebugCapture;

impl DebugCapture for NoDebugCapture {
    fn store(&self, key: &str, _content: &str) {
        tracing::trace!("Debug capture disabled, dropping {}", key);
    }
}
