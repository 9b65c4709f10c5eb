//! Entry-level error kinds shared by every repository.
//!
//! # Responsibility
//! - Name the entity type and identifier involved in a failed lookup or a
//!   uniqueness violation.
//! - Render a stable, human-readable message for each kind.
//!
//! # Invariants
//! - Messages follow `"<Missing|Duplicate> <object_type> (<object_id>)"`.
//! - `DuplicateEntry` is never raised by repository operations; it exists for
//!   callers that translate store-level uniqueness failures.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// A primary-key lookup found nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    pub object_type: String,
    pub object_id: String,
}

impl MissingEntry {
    pub fn new(object_type: impl Into<String>, object_id: impl Display) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.to_string(),
        }
    }
}

impl Display for MissingEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing {} ({})", self.object_type, self.object_id)
    }
}

impl Error for MissingEntry {}

/// An entry with the same identity already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateEntry {
    pub object_type: String,
    pub object_id: String,
}

impl DuplicateEntry {
    pub fn new(object_type: impl Into<String>, object_id: impl Display) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.to_string(),
        }
    }
}

impl Display for DuplicateEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Duplicate {} ({})", self.object_type, self.object_id)
    }
}

impl Error for DuplicateEntry {}

#[cfg(test)]
mod tests {
    use super::{DuplicateEntry, MissingEntry};

    #[test]
    fn missing_entry_keeps_type_and_id() {
        let err = MissingEntry::new("Invoice", "inv-7");
        assert_eq!(err.object_type, "Invoice");
        assert_eq!(err.object_id, "inv-7");
    }

    #[test]
    fn duplicate_entry_renders_numeric_id() {
        assert_eq!(
            DuplicateEntry::new("Invoice", 42_i64).to_string(),
            "Duplicate Invoice (42)"
        );
    }
}
