use repokit_core::{DuplicateEntry, MissingEntry, RepoError};
use std::error::Error;

#[test]
fn entry_errors_render_type_and_id() {
    assert_eq!(MissingEntry::new("Test", 1).to_string(), "Missing Test (1)");
    assert_eq!(DuplicateEntry::new("Test", 1).to_string(), "Duplicate Test (1)");
    assert_eq!(
        MissingEntry::new("User", "a-b-c").to_string(),
        "Missing User (a-b-c)"
    );
}

#[test]
fn entry_errors_keep_their_fields() {
    let missing = MissingEntry::new("Order", 42);
    assert_eq!(missing.object_type, "Order");
    assert_eq!(missing.object_id, "42");
}

#[test]
fn repo_error_wraps_entry_errors() {
    let err = RepoError::missing("Test", 7);
    assert!(err.is_missing());
    assert_eq!(err.object_type(), Some("Test"));
    assert_eq!(err.to_string(), "Missing Test (7)");
    assert!(err.source().is_some());

    let err = RepoError::from(DuplicateEntry::new("Test", 7));
    assert!(!err.is_missing());
    assert_eq!(err.object_type(), Some("Test"));
    assert_eq!(err.to_string(), "Duplicate Test (7)");
}
