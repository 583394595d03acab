//! # kitopen
//!
//! Client for the KITopen publication database export. A search is described
//! by author, year range and a record view; it is translated into the query
//! parameters of the report endpoint, optionally split into several requests,
//! and the CSV-in-ZIP exports are streamed back as [`Record`]s.
//!
//! ## Architecture
//!
//! - [`models`]: Field catalog, record views and records
//! - [`transform`]: Rule-based conversion of typed options into flat key/value maps
//! - [`search`]: Options, query parameters, batching, batches and the result stream
//! - [`fetch`]: Transport seam (HTTP or in-memory)
//! - [`client`]: The [`KitOpen`] entry point
//! - [`config`]: Configuration management
//! - [`utils`]: HTTP client and export archive handling
//! - [`ui`]: Terminal output for the command-line interface

pub mod client;
pub mod config;
pub mod fetch;
pub mod models;
pub mod search;
pub mod transform;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use client::KitOpen;
pub use models::{views, Record, RecordView};
pub use search::{OptionsInput, QueryOptions, SearchError, SearchResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
