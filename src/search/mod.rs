//! The search pipeline: options, batching, batch execution and the
//! aggregated record stream.
//!
//! ```text
//! OptionsInput ──► QueryOptions ──► BatchingStrategy ──► [SearchBatch..] ──► SearchResult ──► Record
//! ```
//!
//! Nothing touches the network until [`SearchResult::next`] is awaited.

mod batch;
mod batching;
mod options;
mod params;
mod result;

pub use batch::{BatchState, SearchBatch};
pub use batching::{BatchingKind, BatchingStrategy, NoSplit, YearSplit};
pub use options::{AuthorFilter, OptionsInput, QueryOptions, SearchDefaults};
pub use params::{ParameterBuilder, Parameters, AUTHOR_SEPARATOR, DEFAULT_PARAMETERS};
pub use result::SearchResult;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::fetch::Fetcher;
use crate::models::ViewError;
use crate::transform::TransformError;

/// Everything a batch needs besides its own options.
///
/// Cheap to clone; shared read-only by every batch of every search.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl SearchContext {
    pub fn new(config: Arc<Config>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }
}

/// Errors that can occur while building or running a search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The endpoint answered with a non-success status
    #[error("request to {url} failed with HTTP status {status}")]
    Connection { status: u16, url: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete before its deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not a usable export archive
    #[error("Archive error: {0}")]
    Archive(String),

    /// The exported CSV could not be parsed
    #[error("CSV error: {0}")]
    Csv(String),

    /// IO error (temporary extraction directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    View(#[from] ViewError),

    /// Options that cannot be turned into batches
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A batch was iterated before it executed successfully
    #[error("batch has not been executed successfully")]
    NotExecuted,
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Network(err.to_string())
    }
}

impl From<zip::result::ZipError> for SearchError {
    fn from(err: zip::result::ZipError) -> Self {
        SearchError::Archive(err.to_string())
    }
}

impl From<csv::Error> for SearchError {
    fn from(err: csv::Error) -> Self {
        SearchError::Csv(err.to_string())
    }
}
