//! Record views: named, ordered, validated subsets of the export field catalog.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Every field identifier the export endpoint understands, in catalog order.
///
/// This is a fixed contract with the remote service. A [`RecordView`] may only
/// reference identifiers from this list.
pub const VALID_FIELDS: &[&str] = &[
    "doi",
    "publication_type",
    "year",
    "date_online",
    "isbn",
    "issn",
    "title",
    "author",
    "collaborations",
    "volume",
    "issue",
    "pages",
    "source",
    "series",
    "series_number",
    "publisher",
    "edition",
    "thesis_type",
    "advisor",
    "event",
    "bibliographic_data",
    "id",
    "cn_id",
    "wos_id",
    "scopus_id",
    "pof_structure",
    "additional_pof_structures",
    "in_wos",
    "in_scopus",
    "in_wos_or_scopus",
    "in_doaj",
    "is_referenced",
    "is_otherwise_referenced",
    "remarks_review_process",
    "is_open_access",
    "with_full_text",
    "is_invited",
    "verification_tasks",
    "languages",
    "organization_names",
    "organization_acronyms",
    "institute_specification",
    "psp_elements_gfb",
    "psp_elements_ub",
    "project_acronym",
    "project_funder",
    "project_funding_id",
    "project_framework_program",
    "remarks_publication",
    "kit_tagging",
    "full_text_type",
    "full_text_state",
    "doi_kitopen",
    "license",
    "embargo",
    "citations",
    "citations_wos",
    "citations_scopus",
    "impact_factor",
    "downloads",
    "page_views",
    "ddc",
    "insert_date",
];

lazy_static::lazy_static! {
    static ref FIELD_SET: HashSet<&'static str> = VALID_FIELDS.iter().copied().collect();
}

/// Whether `field` belongs to the export field catalog
pub fn is_valid_field(field: &str) -> bool {
    FIELD_SET.contains(field)
}

/// Errors raised while building or looking up views
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// A requested field is not part of the catalog
    #[error("field \"{field}\" is not supported in view \"{view}\"")]
    InvalidField { view: String, field: String },

    /// No view is registered under this name
    #[error("unknown view \"{0}\"")]
    UnknownView(String),
}

/// A named, ordered list of catalog fields.
///
/// The view decides which columns a query requests (`table_fields`) and how
/// the values of an exported row are mapped to field names: positionally, in
/// the order of [`RecordView::fields`].
///
/// Views compare equal when both the name and the field sequence (including
/// order and duplicates) match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordView {
    name: String,
    fields: Vec<String>,
}

impl RecordView {
    /// Create a view, validating every field against the catalog
    pub fn new<I, S>(name: impl Into<String>, fields: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();

        if let Some(bad) = fields.iter().find(|f| !is_valid_field(f)) {
            return Err(ViewError::InvalidField {
                view: name,
                field: bad.clone(),
            });
        }

        Ok(Self { name, fields })
    }

    /// View name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field identifiers in request order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of fields (duplicates included)
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Return a new view with `additional` appended to the field list.
    ///
    /// The original is left untouched and duplicates are kept as-is.
    pub fn extend<I, S>(&self, additional: I) -> Result<Self, ViewError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = self
            .fields
            .iter()
            .cloned()
            .chain(additional.into_iter().map(Into::into));
        Self::new(self.name.clone(), fields)
    }

    /// Return a copy of this view under another name
    pub fn rename(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: self.fields.clone(),
        }
    }

    /// Comma-joined field list as sent in the `table_fields` parameter
    pub fn to_table_fields(&self) -> String {
        self.fields.join(",")
    }
}

impl fmt::Display for RecordView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordView(name={}, #fields={})", self.name, self.fields.len())
    }
}

// Views travel through config files and CLI arguments by name.
impl Serialize for RecordView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for RecordView {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        views().get(&name).map_err(serde::de::Error::custom)
    }
}

/// Read-only table of the predefined views
#[derive(Debug)]
pub struct ViewRegistry {
    views: Vec<RecordView>,
}

impl ViewRegistry {
    fn predefined() -> Self {
        let full = RecordView {
            name: "full".to_string(),
            fields: VALID_FIELDS.iter().map(|f| f.to_string()).collect(),
        };
        let basic = RecordView {
            name: "basic".to_string(),
            fields: [
                "doi",
                "id",
                "title",
                "author",
                "year",
                "pof_structure",
                "impact_factor",
                "insert_date",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        };

        Self {
            views: vec![basic, full],
        }
    }

    /// Look up a view by name, returning an owned copy
    pub fn get(&self, name: &str) -> Result<RecordView, ViewError> {
        self.views
            .iter()
            .find(|v| v.name == name)
            .cloned()
            .ok_or_else(|| ViewError::UnknownView(name.to_string()))
    }

    pub fn basic(&self) -> RecordView {
        self.views[0].clone()
    }

    pub fn full(&self) -> RecordView {
        self.views[1].clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordView> {
        self.views.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.views.iter().map(|v| v.name())
    }
}

lazy_static::lazy_static! {
    static ref VIEWS: ViewRegistry = ViewRegistry::predefined();
}

/// The process-wide registry of predefined views
pub fn views() -> &'static ViewRegistry {
    &VIEWS
}
