//! Utility modules supporting the search pipeline.
//!
//! - [`HttpClient`]: shared reqwest client built from the HTTP config
//! - [`archive`]: export unpacking into a scoped temporary directory and CSV reading

pub mod archive;
mod http;

pub use archive::CsvTable;
pub use http::{HttpClient, USER_AGENT};
