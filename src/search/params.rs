//! Translation of search options into the report endpoint's query parameters.

use indexmap::IndexMap;

use crate::transform::{Arm, Content, Rule, TransformError, TransformTable, Value, ValueKind};

/// Flat query-string parameter map, in insertion order
pub type Parameters = IndexMap<String, String>;

/// Parameters the report endpoint expects on every request.
///
/// Anything the rule table produces replaces the entry of the same name.
pub const DEFAULT_PARAMETERS: &[(&str, &str)] = &[
    ("external_publications", "kit"),
    ("open_access_availability", "do_not_care"),
    ("full_text", "do_not_care"),
    ("key_figures", "number_of_publications"),
    ("year", "2015-"),
    ("consider_online_advance_publication_date", "true"),
    ("consider_additional_pof_structures", "false"),
    ("row", "type"),
    ("column", "year"),
    ("authors", "MUSTERMANN"),
    ("table_fields", "title"),
    ("format", "csv"),
    ("publications", "true"),
];

/// Separator between several author patterns in the `authors` parameter
pub const AUTHOR_SEPARATOR: &str = " or ";

/// Builds request parameters from logical search fields.
///
/// The mapping is declared as a [`TransformTable`]:
///
/// | source           | target         | accepted kinds     |
/// |------------------|----------------|--------------------|
/// | `author`         | `authors`      | str, list          |
/// | `(start, end)`   | `year`         | (str, str)         |
/// | `view`           | `table_fields` | view               |
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    table: TransformTable<String>,
}

impl Default for ParameterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterBuilder {
    pub fn new() -> Self {
        let table = TransformTable::new()
            .rule(Rule::one_to_one(
                "author",
                "authors",
                vec![
                    Arm::one(ValueKind::Str, author_from_str),
                    Arm::one(ValueKind::List, author_from_list),
                    Arm::reject_any(),
                ],
            ))
            .rule(Rule::many_to_one(
                ["start", "end"],
                "year",
                vec![
                    Arm::gather([ValueKind::Str, ValueKind::Str], year_range),
                    Arm::reject_any(),
                ],
            ))
            .rule(Rule::one_to_one(
                "view",
                "table_fields",
                vec![Arm::one(ValueKind::View, table_fields), Arm::reject_any()],
            ));

        Self { table }
    }

    /// The default parameter set as an owned map
    pub fn defaults() -> Parameters {
        DEFAULT_PARAMETERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Overlay the transformed `content` onto [`DEFAULT_PARAMETERS`]
    pub fn get_parameters(&self, content: &Content) -> Result<Parameters, TransformError> {
        let mut parameters = Self::defaults();
        parameters.extend(self.table.process(content)?);
        Ok(parameters)
    }
}

fn author_from_str(_key: &str, value: &Value) -> Result<String, TransformError> {
    Ok(value.as_str().unwrap_or_default().to_string())
}

fn author_from_list(_key: &str, value: &Value) -> Result<String, TransformError> {
    Ok(value.as_list().unwrap_or_default().join(AUTHOR_SEPARATOR))
}

fn year_range(_keys: &[String], values: &[&Value]) -> Result<String, TransformError> {
    let start = values.first().and_then(|v| v.as_str()).unwrap_or_default();
    let end = values.get(1).and_then(|v| v.as_str()).unwrap_or_default();
    Ok(format!("{}-{}", start, end))
}

fn table_fields(_key: &str, value: &Value) -> Result<String, TransformError> {
    Ok(value
        .as_view()
        .map(|view| view.to_table_fields())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{views, RecordView};

    fn content(author: Value, start: &str, end: &str, view: RecordView) -> Content {
        let mut content = Content::new();
        content.insert("author".into(), author);
        content.insert("start".into(), Value::from(start));
        content.insert("end".into(), Value::from(end));
        content.insert("view".into(), Value::View(view));
        content
    }

    #[test]
    fn test_single_author_passes_through() {
        let params = ParameterBuilder::new()
            .get_parameters(&content(
                Value::from("KOPMANN, A*"),
                "2018",
                "2020",
                views().basic(),
            ))
            .unwrap();

        assert_eq!(params["authors"], "KOPMANN, A*");
        assert_eq!(params["year"], "2018-2020");
        assert_eq!(
            params["table_fields"],
            "doi,id,title,author,year,pof_structure,impact_factor,insert_date"
        );
    }

    #[test]
    fn test_author_list_is_joined() {
        let params = ParameterBuilder::new()
            .get_parameters(&content(
                Value::List(vec!["A".into(), "B".into()]),
                "2019",
                "",
                views().basic(),
            ))
            .unwrap();

        assert_eq!(params["authors"], "A or B");
        assert_eq!(params["year"], "2019-");
    }

    #[test]
    fn test_defaults_survive_and_order_is_stable() {
        let params = ParameterBuilder::new()
            .get_parameters(&content(Value::from("X"), "2000", "", views().basic()))
            .unwrap();

        assert_eq!(params.len(), DEFAULT_PARAMETERS.len());
        assert_eq!(params["format"], "csv");
        assert_eq!(params["publications"], "true");
        assert_eq!(params["external_publications"], "kit");

        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        let default_keys: Vec<&str> = DEFAULT_PARAMETERS.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, default_keys);
    }

    #[test]
    fn test_wrong_type_names_key_and_value() {
        let err = ParameterBuilder::new()
            .get_parameters(&content(Value::Int(7), "2000", "", views().basic()))
            .unwrap_err();

        match err {
            TransformError::TypeMismatch { key, value, .. } => {
                assert_eq!(key, "author");
                assert_eq!(value, "7");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_string_year_is_rejected() {
        let mut input = content(Value::from("X"), "2000", "", views().basic());
        input.insert("end".into(), Value::Int(2020));

        let err = ParameterBuilder::new().get_parameters(&input).unwrap_err();
        assert!(matches!(err, TransformError::TypeMismatch { ref key, .. } if key == "(start, end)"));
    }

    #[test]
    fn test_missing_view_key() {
        let mut input = content(Value::from("X"), "2000", "", views().basic());
        input.shift_remove("view");

        assert_eq!(
            ParameterBuilder::new().get_parameters(&input).unwrap_err(),
            TransformError::MissingKey {
                key: "view".to_string()
            }
        );
    }
}
