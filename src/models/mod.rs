//! Core data models: record views and the records materialized with them.

mod record;
pub mod view;

pub use record::{AuthorName, Record, RecordError};
pub use view::{is_valid_field, views, RecordView, ViewError, ViewRegistry, VALID_FIELDS};
