//! Filter DSL, query description and SQL rendering.
//!
//! # Responsibility
//! - Turn caller criteria into typed constraints checked against an entity's
//!   field registry.
//! - Render constraints and writes into parameterized SQLite statements.
//!
//! # Invariants
//! - Constraint values are bound as parameters; only registered identifiers
//!   reach statement text.

pub mod filter;
pub mod select;
pub mod sql;

pub use filter::{plan_filter, Condition, Criteria, FilterError, FilterPlan, Operator};
pub use select::{Comparison, Constraint, SelectQuery};
pub use sql::IdentifierError;
