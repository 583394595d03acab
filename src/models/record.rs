//! Record model: one exported row bound to the view it was fetched with.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use super::view::RecordView;

/// Errors raised by record accessors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The record carries no value for this field
    #[error("record has no field \"{0}\"")]
    MissingField(String),
}

/// A single author as listed in the `author` column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub first: String,
    pub last: String,
}

/// One result row.
///
/// The set of keys is fixed by the view at construction time, the values
/// are free to change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    view: Arc<RecordView>,
    data: IndexMap<String, String>,
}

impl Record {
    /// Build a record by pairing `values` with the view's fields by position.
    ///
    /// Column headers play no part here: the i-th value always lands in the
    /// i-th field of the view. Pairing stops at the shorter of the two.
    pub fn from_row<I, S>(view: Arc<RecordView>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let data = view
            .fields()
            .iter()
            .cloned()
            .zip(values.into_iter().map(Into::into))
            .collect();

        Self { view, data }
    }

    /// The view this record was materialized with
    pub fn view(&self) -> &RecordView {
        &self.view
    }

    pub fn data(&self) -> &IndexMap<String, String> {
        &self.data
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }

    /// Set a field value, returning the previous one
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.data.insert(field.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining ones
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.data.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.data.values().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Parse the `author` column into individual names.
    ///
    /// The column holds one `"Last, First"` entry per line. Fails when the
    /// record has no `author` field at all.
    pub fn get_authors(&self) -> Result<Vec<AuthorName>, RecordError> {
        let raw = self
            .get("author")
            .ok_or_else(|| RecordError::MissingField("author".to_string()))?;

        Ok(parse_authors(raw))
    }
}

fn parse_authors(raw: &str) -> Vec<AuthorName> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(", ") {
            Some((last, first)) => AuthorName {
                first: first.to_string(),
                last: last.to_string(),
            },
            None => AuthorName {
                first: String::new(),
                last: line.to_string(),
            },
        })
        .collect()
}

impl Index<&str> for Record {
    type Output = str;

    fn index(&self, field: &str) -> &str {
        match self.data.get(field) {
            Some(value) => value,
            None => panic!("record has no field \"{}\"", field),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record(view={}, data={{", self.view.name())?;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {:?}", key, value)?;
        }
        write!(f, "}})")
    }
}

impl Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}
