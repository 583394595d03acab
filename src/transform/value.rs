//! Dynamically typed values fed to the transformation engine.

use indexmap::IndexMap;
use std::fmt;

use crate::models::RecordView;

/// Keyed input of a transformation
pub type Content = IndexMap<String, Value>;

/// A value whose runtime shape decides which rule arm handles it
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Int(i64),
    View(RecordView),
    Null,
}

impl Value {
    /// Runtime kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Int(_) => ValueKind::Int,
            Value::View(_) => ValueKind::View,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&RecordView> {
        match self {
            Value::View(view) => Some(view),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => write!(f, "{:?}", items),
            Value::Int(i) => write!(f, "{}", i),
            Value::View(view) => write!(f, "{}", view),
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<RecordView> for Value {
    fn from(view: RecordView) -> Self {
        Value::View(view)
    }
}

/// Type tag used on the left side of a rule arm.
///
/// `Any` matches every value and serves as the trailing catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Str,
    List,
    Int,
    View,
    Null,
    Any,
}

impl ValueKind {
    pub fn matches(self, value: &Value) -> bool {
        self == ValueKind::Any || self == value.kind()
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Int => "int",
            ValueKind::View => "view",
            ValueKind::Null => "null",
            ValueKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// Pattern matched against one value or a tuple of values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePattern {
    Single(ValueKind),
    Tuple(Vec<ValueKind>),
}

impl TypePattern {
    /// The catch-all pattern
    pub fn any() -> Self {
        TypePattern::Single(ValueKind::Any)
    }

    pub fn matches_value(&self, value: &Value) -> bool {
        match self {
            TypePattern::Single(kind) => kind.matches(value),
            TypePattern::Tuple(_) => false,
        }
    }

    /// Positional membership: every i-th kind must match the i-th value
    pub fn matches_values(&self, values: &[&Value]) -> bool {
        match self {
            TypePattern::Single(kind) => *kind == ValueKind::Any,
            TypePattern::Tuple(kinds) => {
                kinds.len() == values.len()
                    && kinds.iter().zip(values).all(|(k, v)| k.matches(v))
            }
        }
    }
}

impl From<ValueKind> for TypePattern {
    fn from(kind: ValueKind) -> Self {
        TypePattern::Single(kind)
    }
}

impl<const N: usize> From<[ValueKind; N]> for TypePattern {
    fn from(kinds: [ValueKind; N]) -> Self {
        TypePattern::Tuple(kinds.to_vec())
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypePattern::Single(kind) => write!(f, "{}", kind),
            TypePattern::Tuple(kinds) => {
                let parts: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ValueKind::*;

    #[test]
    fn test_kind_matching() {
        assert!(Str.matches(&Value::from("x")));
        assert!(!Str.matches(&Value::Int(1)));
        assert!(Any.matches(&Value::Null));
    }

    #[test]
    fn test_tuple_matching_is_positional() {
        let pattern = TypePattern::from([Str, Str]);
        let int = Value::Int(1);
        let s = Value::from("x");

        assert!(pattern.matches_values(&[&s, &s]));
        assert!(!pattern.matches_values(&[&int, &s]));
        assert!(!pattern.matches_values(&[&s]));
        assert!(TypePattern::from([Any, Any]).matches_values(&[&int, &s]));
        assert!(TypePattern::any().matches_values(&[&int, &s]));
        assert!(!TypePattern::Single(Str).matches_values(&[&s, &s]));
    }

    #[test]
    fn test_display() {
        assert_eq!(TypePattern::from([Str, Int]).to_string(), "(str, int)");
        assert_eq!(Value::List(vec!["A".into()]).to_string(), r#"["A"]"#);
    }
}
