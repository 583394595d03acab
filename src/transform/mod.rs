//! Declarative, type-dispatched remapping of keyed maps.
//!
//! A [`TransformTable`] holds an ordered list of [`Rule`]s. Each rule reads one
//! or more source keys from the input [`Content`], picks the first [`Arm`]
//! whose [`TypePattern`] matches the runtime kind of the value(s), and writes
//! the handler's output under one or more target keys.
//!
//! Three rule shapes exist:
//!
//! - **one-to-one**: `source -> target`
//! - **one-to-many**: `source -> (t1, .., tn)`, handler returns exactly `n` values
//! - **many-to-one**: `(s1, .., sn) -> target`, matched against tuple patterns
//!
//! ```
//! use kitopen::transform::{Arm, Rule, TransformTable, Value, ValueKind};
//!
//! let table: TransformTable<String> = TransformTable::new()
//!     .rule(Rule::one_to_one("n", "text", vec![
//!         Arm::one(ValueKind::Int, |_, v| Ok(v.to_string())),
//!         Arm::reject_any(),
//!     ]));
//!
//! let mut content = kitopen::transform::Content::new();
//! content.insert("n".into(), Value::Int(10));
//! assert_eq!(table.process(&content).unwrap()["text"], "10");
//! ```

mod value;

pub use value::{Content, TypePattern, Value, ValueKind};

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Errors raised while applying a transformation table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A source key named by a rule is absent from the input
    #[error("missing key \"{key}\" in transformation input")]
    MissingKey { key: String },

    /// No arm of the rule matched the value's runtime kind
    #[error("no handler for key \"{key}\" with value {value}; supported types: {supported}")]
    UnsupportedType {
        key: String,
        value: String,
        supported: String,
    },

    /// The value was routed to a rejecting arm
    #[error("key \"{key}\" is not supposed to be {value}; expected one of: {supported}")]
    TypeMismatch {
        key: String,
        value: String,
        supported: String,
    },

    /// A one-to-many handler returned the wrong number of values
    #[error("handler for \"{source_key}\" returned {actual} values, expected {expected}")]
    Arity {
        source_key: String,
        expected: usize,
        actual: usize,
    },
}

/// Handler of a one-to-one rule
pub type OneHandler<O> = Arc<dyn Fn(&str, &Value) -> Result<O, TransformError> + Send + Sync>;

/// Handler of a one-to-many rule
pub type SpreadHandler<O> =
    Arc<dyn Fn(&str, &Value) -> Result<Vec<O>, TransformError> + Send + Sync>;

/// Handler of a many-to-one rule
pub type GatherHandler<O> =
    Arc<dyn Fn(&[String], &[&Value]) -> Result<O, TransformError> + Send + Sync>;

#[derive(Clone)]
enum Action<H> {
    Call(H),
    Reject,
}

/// One `(pattern, handler)` entry of a rule, tried in declaration order
#[derive(Clone)]
pub struct Arm<H> {
    pattern: TypePattern,
    action: Action<H>,
}

impl<H> Arm<H> {
    /// An arm that fails with [`TransformError::TypeMismatch`] when matched
    pub fn reject(pattern: impl Into<TypePattern>) -> Self {
        Self {
            pattern: pattern.into(),
            action: Action::Reject,
        }
    }

    /// The usual trailing arm: reject whatever nothing above accepted
    pub fn reject_any() -> Self {
        Self::reject(TypePattern::any())
    }
}

impl<O> Arm<OneHandler<O>> {
    pub fn one<F>(pattern: impl Into<TypePattern>, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<O, TransformError> + Send + Sync + 'static,
    {
        Self {
            pattern: pattern.into(),
            action: Action::Call(Arc::new(handler)),
        }
    }
}

impl<O> Arm<SpreadHandler<O>> {
    pub fn spread<F>(pattern: impl Into<TypePattern>, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Vec<O>, TransformError> + Send + Sync + 'static,
    {
        Self {
            pattern: pattern.into(),
            action: Action::Call(Arc::new(handler)),
        }
    }
}

impl<O> Arm<GatherHandler<O>> {
    pub fn gather<F>(pattern: impl Into<TypePattern>, handler: F) -> Self
    where
        F: Fn(&[String], &[&Value]) -> Result<O, TransformError> + Send + Sync + 'static,
    {
        Self {
            pattern: pattern.into(),
            action: Action::Call(Arc::new(handler)),
        }
    }
}

impl<H> fmt::Debug for Arm<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            Action::Call(_) => "call",
            Action::Reject => "reject",
        };
        write!(f, "{} => {}", self.pattern, action)
    }
}

/// A single remapping rule; the variant is the rule's shape
#[derive(Clone, Debug)]
pub enum Rule<O> {
    OneToOne {
        source: String,
        target: String,
        arms: Vec<Arm<OneHandler<O>>>,
    },
    OneToMany {
        source: String,
        targets: Vec<String>,
        arms: Vec<Arm<SpreadHandler<O>>>,
    },
    ManyToOne {
        sources: Vec<String>,
        target: String,
        arms: Vec<Arm<GatherHandler<O>>>,
    },
}

impl<O> Rule<O> {
    pub fn one_to_one(
        source: impl Into<String>,
        target: impl Into<String>,
        arms: Vec<Arm<OneHandler<O>>>,
    ) -> Self {
        Rule::OneToOne {
            source: source.into(),
            target: target.into(),
            arms,
        }
    }

    pub fn one_to_many<I, S>(
        source: impl Into<String>,
        targets: I,
        arms: Vec<Arm<SpreadHandler<O>>>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::OneToMany {
            source: source.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            arms,
        }
    }

    pub fn many_to_one<I, S>(
        sources: I,
        target: impl Into<String>,
        arms: Vec<Arm<GatherHandler<O>>>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::ManyToOne {
            sources: sources.into_iter().map(Into::into).collect(),
            target: target.into(),
            arms,
        }
    }

    fn apply(&self, content: &Content, result: &mut IndexMap<String, O>) -> Result<(), TransformError> {
        match self {
            Rule::OneToOne {
                source,
                target,
                arms,
            } => {
                let value = lookup(content, source)?;
                let handler = select(arms, |p| p.matches_value(value), source, || value.to_string())?;
                result.insert(target.clone(), handler(source.as_str(), value)?);
            }
            Rule::OneToMany {
                source,
                targets,
                arms,
            } => {
                let value = lookup(content, source)?;
                let handler = select(arms, |p| p.matches_value(value), source, || value.to_string())?;
                let outputs = handler(source.as_str(), value)?;
                if outputs.len() != targets.len() {
                    return Err(TransformError::Arity {
                        source_key: source.clone(),
                        expected: targets.len(),
                        actual: outputs.len(),
                    });
                }
                for (target, output) in targets.iter().zip(outputs) {
                    result.insert(target.clone(), output);
                }
            }
            Rule::ManyToOne {
                sources,
                target,
                arms,
            } => {
                let values = sources
                    .iter()
                    .map(|key| lookup(content, key))
                    .collect::<Result<Vec<_>, _>>()?;
                let key = format!("({})", sources.join(", "));
                let handler = select(arms, |p| p.matches_values(&values), &key, || {
                    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                    format!("({})", parts.join(", "))
                })?;
                result.insert(target.clone(), handler(sources.as_slice(), values.as_slice())?);
            }
        }
        Ok(())
    }
}

fn lookup<'a>(content: &'a Content, key: &str) -> Result<&'a Value, TransformError> {
    content.get(key).ok_or_else(|| TransformError::MissingKey {
        key: key.to_string(),
    })
}

/// First arm whose pattern matches wins
fn select<'a, H>(
    arms: &'a [Arm<H>],
    matches: impl Fn(&TypePattern) -> bool,
    key: &str,
    describe: impl Fn() -> String,
) -> Result<&'a H, TransformError> {
    let supported = || {
        let accepted: Vec<String> = arms
            .iter()
            .filter(|arm| matches!(arm.action, Action::Call(_)))
            .map(|arm| arm.pattern.to_string())
            .collect();
        accepted.join(", ")
    };

    match arms.iter().find(|arm| matches(&arm.pattern)) {
        Some(Arm {
            action: Action::Call(handler),
            ..
        }) => Ok(handler),
        Some(Arm {
            action: Action::Reject,
            ..
        }) => Err(TransformError::TypeMismatch {
            key: key.to_string(),
            value: describe(),
            supported: supported(),
        }),
        None => Err(TransformError::UnsupportedType {
            key: key.to_string(),
            value: describe(),
            supported: supported(),
        }),
    }
}

/// Ordered rule table producing a keyed map of `O`
#[derive(Clone, Debug)]
pub struct TransformTable<O> {
    rules: Vec<Rule<O>>,
}

impl<O> Default for TransformTable<O> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<O> TransformTable<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (builder style)
    pub fn rule(mut self, rule: Rule<O>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Apply every rule in declaration order and merge the outputs.
    ///
    /// A later rule writing an existing target key overwrites it.
    pub fn process(&self, content: &Content) -> Result<IndexMap<String, O>, TransformError> {
        let mut result = IndexMap::new();
        for rule in &self.rules {
            rule.apply(content, &mut result)?;
        }
        Ok(result)
    }
}
