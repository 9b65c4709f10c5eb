//! Filter criteria DSL and its translation into query constraints.
//!
//! # Responsibility
//! - Represent `{field: scalar}` / `{field: {"op", "value"}}` criteria in
//!   insertion order.
//! - Resolve each entry against an entity's field registry.
//!
//! # Invariants
//! - Folding stops at the first unknown field; later entries are not looked at.
//! - An unrecognized operator or a value of the wrong shape produces no
//!   constraint; it is reported back as a skipped condition.

use super::select::{Comparison, Constraint};
use crate::model::{Field, Record, Table};
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Comparison operators accepted in condition objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Like,
    InBetween,
}

impl Operator {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "in" => Some(Self::In),
            "like" => Some(Self::Like),
            "in_between" => Some(Self::InBetween),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::Like => "like",
            Self::InBetween => "in_between",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of one criteria entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Plain scalar: field equals value.
    Equals(Value),
    /// Condition object. `op` is kept raw so unknown operators survive parsing.
    Op { op: String, value: Value },
}

impl Condition {
    pub fn op(op: Operator, value: impl Into<Value>) -> Self {
        Self::Op {
            op: op.as_str().to_string(),
            value: value.into(),
        }
    }

    /// Reads a JSON criteria value; any object is a condition object.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(mut object) => {
                let op = match object.remove("op") {
                    None | Some(Value::Null) => Operator::Eq.as_str().to_string(),
                    Some(Value::String(op)) => op,
                    Some(other) => other.to_string(),
                };
                let value = object.remove("value").unwrap_or(Value::Null);
                Self::Op { op, value }
            }
            scalar => Self::Equals(scalar),
        }
    }
}

/// Ordered filter criteria: field name to condition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Record")]
pub struct Criteria {
    entries: Vec<(String, Condition)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain equality entry.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Equals(value.into()))
    }

    /// Adds a condition-object entry.
    pub fn cond(self, field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.with(field, Condition::op(op, value))
    }

    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.push(field, condition);
        self
    }

    /// Adds an entry; a repeated field name replaces the earlier condition
    /// in place, the way a mapping would.
    pub fn push(&mut self, field: impl Into<String>, condition: Condition) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = condition,
            None => self.entries.push((field, condition)),
        }
    }

    /// Parses a JSON criteria mapping.
    pub fn from_json(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(record) => Ok(Self::from(record)),
            other => Err(FilterError::NotAMapping(other.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.entries
            .iter()
            .map(|(field, condition)| (field.as_str(), condition))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Record> for Criteria {
    fn from(value: Record) -> Self {
        let mut criteria = Self::new();
        for (field, condition) in value {
            criteria.push(field, Condition::from_json(condition));
        }
        criteria
    }
}

/// Constraints produced from criteria, plus any conditions that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPlan {
    pub constraints: Vec<Constraint>,
    pub skipped: Vec<FilterError>,
}

/// Folds criteria into constraints for `table`.
///
/// # Errors
/// - `FilterError::UnknownField` for the first field the table does not
///   register. Remaining entries are not inspected.
pub fn plan_filter(table: &Table, criteria: &Criteria) -> Result<FilterPlan, FilterError> {
    let mut plan = FilterPlan::default();

    for (name, condition) in criteria.iter() {
        let Some(field) = table.field(name) else {
            return Err(FilterError::UnknownField {
                entity: table.entity.to_string(),
                field: name.to_string(),
            });
        };

        match resolve(field, condition) {
            Ok(constraint) => plan.constraints.push(constraint),
            Err(skipped) => plan.skipped.push(skipped),
        }
    }

    Ok(plan)
}

fn resolve(field: &'static Field, condition: &Condition) -> Result<Constraint, FilterError> {
    let (raw_op, value) = match condition {
        Condition::Equals(value) => {
            return Ok(Constraint::compare(field, Comparison::Eq, value.clone()))
        }
        Condition::Op { op, value } => (op.as_str(), value),
    };

    let unsupported = |reason: &'static str| FilterError::UnsupportedCondition {
        field: field.name.to_string(),
        op: raw_op.to_string(),
        reason,
    };

    let op = Operator::parse(raw_op).ok_or_else(|| unsupported("unknown operator"))?;
    let compare = |comparison: Comparison| -> Result<Constraint, FilterError> {
        Ok(Constraint::compare(field, comparison, value.clone()))
    };
    let ordered = |comparison: Comparison| match value {
        Value::Array(_) | Value::Object(_) => Err(unsupported("ordering expects a scalar value")),
        _ => compare(comparison),
    };

    match op {
        Operator::Eq => compare(Comparison::Eq),
        Operator::NotEq => compare(Comparison::NotEq),
        Operator::Lt => ordered(Comparison::Lt),
        Operator::Le => ordered(Comparison::Le),
        Operator::Gt => ordered(Comparison::Gt),
        Operator::Ge => ordered(Comparison::Ge),
        Operator::In => match value {
            Value::Array(values) => Ok(Constraint::In {
                field,
                values: values.clone(),
            }),
            _ => Err(unsupported("`in` expects an array value")),
        },
        Operator::Like => match value {
            Value::String(pattern) => Ok(Constraint::Like {
                field,
                pattern: pattern.clone(),
            }),
            _ => Err(unsupported("`like` expects a string pattern")),
        },
        Operator::InBetween => match value {
            Value::Array(bounds) if bounds.len() == 2 => Ok(Constraint::Between {
                field,
                low: bounds[0].clone(),
                high: bounds[1].clone(),
            }),
            _ => Err(unsupported("`in_between` expects a two-element array")),
        },
    }
}

/// Malformed filter input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    UnknownField {
        entity: String,
        field: String,
    },
    UnsupportedCondition {
        field: String,
        op: String,
        reason: &'static str,
    },
    NotAMapping(String),
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { entity, field } => {
                write!(f, "{entity} has no field `{field}`")
            }
            Self::UnsupportedCondition { field, op, reason } => {
                write!(f, "unsupported condition `{op}` on `{field}`: {reason}")
            }
            Self::NotAMapping(raw) => write!(f, "criteria must be a mapping, got `{raw}`"),
        }
    }
}

impl Error for FilterError {}

#[cfg(test)]
mod tests {
    use super::{plan_filter, Condition, Criteria, FilterError, Operator};
    use crate::model::{Field, Table};
    use crate::query::select::{Comparison, Constraint};
    use serde_json::json;

    const BOOKS: Table = Table {
        entity: "Book",
        name: "books",
        primary_key: "id",
        fields: &[
            Field::integer("id"),
            Field::text("title"),
            Field::integer("pages"),
        ],
    };

    #[test]
    fn condition_object_defaults_to_equality() {
        let condition = Condition::from_json(json!({"value": 3}));
        assert_eq!(
            condition,
            Condition::Op {
                op: "=".to_string(),
                value: json!(3)
            }
        );
    }

    #[test]
    fn criteria_from_json_keeps_insertion_order() {
        let criteria =
            Criteria::from_json(json!({"title": "Dune", "pages": {"op": ">", "value": 100}}))
                .unwrap();
        let fields = criteria.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(fields, vec!["title", "pages"]);
    }

    #[test]
    fn criteria_from_json_rejects_non_mapping() {
        let err = Criteria::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, FilterError::NotAMapping(_)));
    }

    #[test]
    fn plan_stops_at_first_unknown_field() {
        let criteria = Criteria::new()
            .eq("title", "Dune")
            .eq("author", "Herbert")
            .cond("pages", Operator::Gt, 10);

        let err = plan_filter(&BOOKS, &criteria).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownField {
                entity: "Book".to_string(),
                field: "author".to_string()
            }
        );
    }

    #[test]
    fn plan_skips_mismatched_values() {
        let criteria = Criteria::new()
            .cond("pages", Operator::In, 5)
            .cond("title", Operator::Like, 5)
            .cond("pages", Operator::InBetween, json!([1]))
            .with(
                "id",
                Condition::Op {
                    op: "~".to_string(),
                    value: json!(1),
                },
            );

        let plan = plan_filter(&BOOKS, &criteria).unwrap();
        assert!(plan.constraints.is_empty());
        // `pages` was replaced in place, so three entries remain.
        assert_eq!(plan.skipped.len(), 3);
    }

    #[test]
    fn plan_builds_range_and_membership() {
        let criteria = Criteria::new()
            .cond("pages", Operator::InBetween, json!([100, 200]))
            .cond("id", Operator::In, json!([1, 2]));

        let plan = plan_filter(&BOOKS, &criteria).unwrap();
        assert_eq!(plan.constraints.len(), 2);
        assert!(matches!(
            &plan.constraints[0],
            Constraint::Between { low, high, .. } if *low == json!(100) && *high == json!(200)
        ));
        assert!(matches!(
            &plan.constraints[1],
            Constraint::In { values, .. } if values.len() == 2
        ));
    }

    #[test]
    fn ordering_skips_array_and_object_values() {
        let criteria = Criteria::new()
            .cond("pages", Operator::Gt, json!([1]))
            .cond("id", Operator::Le, json!({"x": 1}))
            .cond("title", Operator::Lt, "M");

        let plan = plan_filter(&BOOKS, &criteria).unwrap();
        assert_eq!(plan.constraints.len(), 1);
        assert_eq!(plan.skipped.len(), 2);
        assert!(matches!(
            &plan.skipped[0],
            FilterError::UnsupportedCondition { op, .. } if op == ">"
        ));
    }

    #[test]
    fn scalar_entry_becomes_equality() {
        let plan = plan_filter(&BOOKS, &Criteria::new().eq("title", "Dune")).unwrap();
        assert!(matches!(
            &plan.constraints[0],
            Constraint::Compare { op: Comparison::Eq, .. }
        ));
    }
}
