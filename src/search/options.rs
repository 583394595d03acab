//! Search options: the validated, defaulted form of one search request.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::params::{ParameterBuilder, Parameters};
use crate::models::{views, RecordView};
use crate::transform::{Content, TransformError, Value};

/// Author filter: one pattern, or several combined with `or`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorFilter {
    One(String),
    Many(Vec<String>),
}

impl AuthorFilter {
    fn to_value(&self) -> Value {
        match self {
            AuthorFilter::One(author) => Value::Str(author.clone()),
            AuthorFilter::Many(authors) => Value::List(authors.clone()),
        }
    }
}

impl From<&str> for AuthorFilter {
    fn from(author: &str) -> Self {
        AuthorFilter::One(author.to_string())
    }
}

impl From<String> for AuthorFilter {
    fn from(author: String) -> Self {
        AuthorFilter::One(author)
    }
}

impl From<Vec<String>> for AuthorFilter {
    fn from(authors: Vec<String>) -> Self {
        AuthorFilter::Many(authors)
    }
}

impl From<Vec<&str>> for AuthorFilter {
    fn from(authors: Vec<&str>) -> Self {
        AuthorFilter::Many(authors.into_iter().map(String::from).collect())
    }
}

impl fmt::Display for AuthorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorFilter::One(author) => f.write_str(author),
            AuthorFilter::Many(authors) => write!(f, "{}", authors.join(" | ")),
        }
    }
}

/// Fallback values for options a caller leaves out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDefaults {
    #[serde(default = "default_author")]
    pub default_author: AuthorFilter,

    #[serde(default = "default_start")]
    pub default_start: String,

    #[serde(default)]
    pub default_end: String,

    #[serde(default = "default_view")]
    pub default_view: RecordView,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            default_author: default_author(),
            default_start: default_start(),
            default_end: String::new(),
            default_view: default_view(),
        }
    }
}

fn default_author() -> AuthorFilter {
    AuthorFilter::from("MUSTERMANN, M*")
}

fn default_start() -> String {
    "2000".to_string()
}

fn default_view() -> RecordView {
    views().basic()
}

/// Partially filled options as accepted by the search entry point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsInput {
    #[serde(default)]
    pub author: Option<AuthorFilter>,

    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,

    #[serde(default)]
    pub view: Option<RecordView>,
}

impl OptionsInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: impl Into<AuthorFilter>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn view(mut self, view: RecordView) -> Self {
        self.view = Some(view);
        self
    }
}

/// One concrete search request.
///
/// `end` may be empty, meaning "open ended". The query parameters are
/// derived from the current field values each time
/// [`QueryOptions::to_query_parameters`] is called.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub author: AuthorFilter,
    pub start: String,
    pub end: String,
    pub view: RecordView,
    builder: ParameterBuilder,
}

impl QueryOptions {
    pub fn new(
        author: impl Into<AuthorFilter>,
        start: impl Into<String>,
        end: impl Into<String>,
        view: RecordView,
    ) -> Self {
        Self {
            author: author.into(),
            start: start.into(),
            end: end.into(),
            view,
            builder: ParameterBuilder::new(),
        }
    }

    /// Fill every field missing from `input` with the matching `default_*` value
    pub fn from_partial(input: OptionsInput, defaults: &SearchDefaults) -> Self {
        Self::new(
            input
                .author
                .unwrap_or_else(|| defaults.default_author.clone()),
            input
                .start
                .unwrap_or_else(|| defaults.default_start.clone()),
            input.end.unwrap_or_else(|| defaults.default_end.clone()),
            input.view.unwrap_or_else(|| defaults.default_view.clone()),
        )
    }

    /// Copy of these options restricted to another year window
    pub fn with_years(&self, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            ..self.clone()
        }
    }

    /// The options as a keyed map for the transformation engine
    pub fn to_content(&self) -> Content {
        let mut content = Content::new();
        content.insert("author".to_string(), self.author.to_value());
        content.insert("start".to_string(), Value::Str(self.start.clone()));
        content.insert("end".to_string(), Value::Str(self.end.clone()));
        content.insert("view".to_string(), Value::View(self.view.clone()));
        content
    }

    /// GET parameters for the report endpoint
    pub fn to_query_parameters(&self) -> Result<Parameters, TransformError> {
        self.builder.get_parameters(&self.to_content())
    }
}

impl PartialEq for QueryOptions {
    fn eq(&self, other: &Self) -> bool {
        self.author == other.author
            && self.start == other.start
            && self.end == other.end
            && self.view == other.view
    }
}

impl fmt::Display for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueryOptions(author=\"{}\", start=\"{}\", end=\"{}\", view={})",
            self.author, self.start, self.end, self.view
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_empty_input_uses_defaults() {
        let options = QueryOptions::from_partial(OptionsInput::new(), &SearchDefaults::default());

        assert_eq!(options.author, AuthorFilter::from("MUSTERMANN, M*"));
        assert_eq!(options.start, "2000");
        assert_eq!(options.end, "");
        assert_eq!(options.view, views().basic());
    }

    #[test]
    fn test_partial_input_overrides_only_given_fields() {
        let defaults = SearchDefaults {
            default_start: "1999".to_string(),
            ..SearchDefaults::default()
        };
        let input = OptionsInput::new().author("KOPMANN, A*").end("2021");
        let options = QueryOptions::from_partial(input, &defaults);

        assert_eq!(options.author, AuthorFilter::from("KOPMANN, A*"));
        assert_eq!(options.start, "1999");
        assert_eq!(options.end, "2021");
    }

    #[test]
    fn test_parameters_follow_field_changes() {
        let mut options = QueryOptions::new("A", "2018", "2020", views().basic());
        assert_eq!(options.to_query_parameters().unwrap()["year"], "2018-2020");

        options.end = "2022".to_string();
        options.author = AuthorFilter::from(vec!["A", "B"]);
        let params = options.to_query_parameters().unwrap();
        assert_eq!(params["year"], "2018-2022");
        assert_eq!(params["authors"], "A or B");
    }

    #[test]
    fn test_with_years_keeps_other_fields() {
        let base = QueryOptions::new("A", "2018", "2021", views().full());
        let window = base.with_years("2019", "2020");

        assert_eq!(window.start, "2019");
        assert_eq!(window.end, "2020");
        assert_eq!(window.author, base.author);
        assert_eq!(window.view, base.view);
        assert_eq!(base.start, "2018");
    }

    #[test]
    fn test_input_deserializes_author_shapes() {
        let one: OptionsInput = serde_json::from_str(r#"{"author": "X"}"#).unwrap();
        assert_eq!(one.author, Some(AuthorFilter::from("X")));

        let many: OptionsInput =
            serde_json::from_str(r#"{"author": ["X", "Y"], "view": "full"}"#).unwrap();
        assert_eq!(many.author, Some(AuthorFilter::from(vec!["X", "Y"])));
        assert_eq!(many.view, Some(views().full()));
    }

    #[test]
    fn test_display() {
        let options = QueryOptions::new("A", "2018", "", views().basic());
        assert_eq!(
            options.to_string(),
            "QueryOptions(author=\"A\", start=\"2018\", end=\"\", view=RecordView(name=basic, #fields=8))"
        );
    }
}
