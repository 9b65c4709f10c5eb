//! Storage-agnostic description of a single-table read.

use crate::model::Field;
use serde_json::Value;

/// Binary comparison applied by a [`Constraint::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// One `WHERE` term; terms of a query are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Compare {
        field: &'static Field,
        op: Comparison,
        value: Value,
    },
    In {
        field: &'static Field,
        values: Vec<Value>,
    },
    Like {
        field: &'static Field,
        pattern: String,
    },
    /// Inclusive on both ends.
    Between {
        field: &'static Field,
        low: Value,
        high: Value,
    },
}

impl Constraint {
    pub fn compare(field: &'static Field, op: Comparison, value: Value) -> Self {
        Self::Compare { field, op, value }
    }

    pub fn field(&self) -> &'static Field {
        match self {
            Self::Compare { field, .. }
            | Self::In { field, .. }
            | Self::Like { field, .. }
            | Self::Between { field, .. } => *field,
        }
    }
}

/// Constraints plus offset/limit over one table's registered columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    constraints: Vec<Constraint>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constraints(constraints: Vec<Constraint>) -> Self {
        Self {
            constraints,
            ..Self::default()
        }
    }

    pub fn filter(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// Same query capped to a single row.
    pub fn first(&self) -> Self {
        let limit = self.limit.map_or(1, |limit| limit.min(1));
        self.clone().limit(limit)
    }
}
