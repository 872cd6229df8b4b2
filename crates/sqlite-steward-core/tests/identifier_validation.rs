// crates/sqlite-steward-core/tests/identifier_validation.rs
// ============================================================================
// Module: Identifier Validation Tests
// Description: Syntactic and reserved-word checks for SQL identifiers.
// Purpose: Validate that unsafe names never reach SQL interpolation.
// ============================================================================

//! ## Overview
//! Property and example tests for identifier validation:
//! - Valid identifiers round-trip unchanged (case preserved)
//! - Illegal shapes fail (empty, digit-start, foreign characters)
//! - Reserved keywords fail in any letter case

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::prop_assert;
use proptest::prelude::prop_assert_eq;
use proptest::prelude::prop_assume;
use proptest::proptest;
use sqlite_steward_core::IdentifierKind;
use sqlite_steward_core::RESERVED_KEYWORDS;
use sqlite_steward_core::StewardError;
use sqlite_steward_core::validate_identifier;

// ============================================================================
// SECTION: Examples
// ============================================================================

#[test]
fn valid_identifiers_are_returned_unchanged() {
    for name in ["users", "_hidden", "Table1", "snake_case_name", "X"] {
        let validated = validate_identifier(name, IdentifierKind::Table).expect("valid name");
        assert_eq!(validated, name);
    }
}

#[test]
fn empty_identifiers_are_rejected() {
    let Err(err) = validate_identifier("", IdentifierKind::Column) else {
        panic!("expected an empty column name to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
    assert!(err.to_string().contains("column name"));
}

#[test]
fn digit_start_identifiers_are_rejected() {
    let Err(err) = validate_identifier("1users", IdentifierKind::Table) else {
        panic!("expected a digit-start name to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
}

#[test]
fn injection_shaped_identifiers_are_rejected() {
    for name in ["users; DROP TABLE users", "users--", "a b", "semi;colon", "quo'te"] {
        assert!(
            validate_identifier(name, IdentifierKind::Table).is_err(),
            "expected {name:?} to fail",
        );
    }
}

#[test]
fn reserved_keywords_are_rejected_in_any_case() {
    for keyword in ["select", "SELECT", "Select", "table", "WHERE", "Insert", "jOiN"] {
        let Err(err) = validate_identifier(keyword, IdentifierKind::Table) else {
            panic!("expected reserved keyword {keyword:?} to fail");
        };
        assert!(err.to_string().contains("reserved keyword"));
    }
}

#[test]
fn every_reserved_keyword_is_rejected() {
    for keyword in RESERVED_KEYWORDS {
        assert!(validate_identifier(keyword, IdentifierKind::Column).is_err());
        assert!(validate_identifier(&keyword.to_uppercase(), IdentifierKind::Column).is_err());
    }
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn generated_valid_identifiers_round_trip(name in "[A-Za-z_][A-Za-z0-9_]{0,15}") {
        prop_assume!(!RESERVED_KEYWORDS.contains(&name.to_lowercase().as_str()));
        let validated = validate_identifier(&name, IdentifierKind::Column)
            .expect("generated identifier should validate");
        prop_assert_eq!(validated, name.as_str());
    }

    #[test]
    fn identifiers_with_foreign_characters_fail(
        prefix in "[A-Za-z_][A-Za-z0-9_]{0,8}",
        bad in "[^A-Za-z0-9_]",
    ) {
        let name = format!("{prefix}{bad}");
        prop_assert!(validate_identifier(&name, IdentifierKind::Column).is_err());
    }

    #[test]
    fn digit_start_names_fail(name in "[0-9][A-Za-z0-9_]{0,8}") {
        prop_assert!(validate_identifier(&name, IdentifierKind::Column).is_err());
    }
}
