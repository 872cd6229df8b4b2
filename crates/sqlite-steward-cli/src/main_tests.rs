// crates/sqlite-steward-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for option parsing in the CLI entry point.
// Purpose: Ensure declarative options map onto core requests faithfully.
// Dependencies: sqlite-steward-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the argument parsing helpers: JSON-or-string parameters,
//! pragma overrides, octal modes, column specs, timeout conversion,
//! rotation pairing, and locale resolution.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use clap::Parser;
use serde_json::json;
use sqlite_steward_cli::i18n::Locale;

use super::Cli;
use super::Commands;
use super::LangArg;
use super::parse_column_spec;
use super::parse_mode;
use super::parse_param;
use super::parse_pragma_override;
use super::parse_rotation;
use super::parse_timeout;
use super::resolve_locale;

// ============================================================================
// SECTION: Parameter Parsing
// ============================================================================

#[test]
fn params_parse_as_json_with_string_fallback() {
    assert_eq!(parse_param("42"), json!(42));
    assert_eq!(parse_param("4.5"), json!(4.5));
    assert_eq!(parse_param("null"), json!(null));
    assert_eq!(parse_param("true"), json!(true));
    assert_eq!(parse_param("\"quoted\""), json!("quoted"));
    assert_eq!(parse_param("plain text"), json!("plain text"));
}

#[test]
fn pragma_overrides_require_name_and_value() {
    let (name, value) = parse_pragma_override("journal_mode=DELETE").expect("valid override");
    assert_eq!(name, "journal_mode");
    assert_eq!(value, "DELETE");
    assert!(parse_pragma_override("journal_mode").is_err());
    assert!(parse_pragma_override("=DELETE").is_err());
    assert!(parse_pragma_override("journal_mode=").is_err());
}

#[test]
fn timeout_converts_to_a_deadline_policy() {
    let policy = parse_timeout(1.5).expect("valid timeout");
    assert_eq!(policy.limit, Duration::from_millis(1_500));
    let unbounded = parse_timeout(0.0).expect("zero timeout");
    assert!(unbounded.is_unbounded());
    assert!(parse_timeout(-1.0).is_err());
    assert!(parse_timeout(f64::NAN).is_err());
}

// ============================================================================
// SECTION: Db And Table Parsing
// ============================================================================

#[test]
fn modes_parse_as_octal() {
    assert_eq!(parse_mode("0640").expect("valid mode"), 0o640);
    assert_eq!(parse_mode("0o600").expect("valid mode"), 0o600);
    assert!(parse_mode("rw-r--r--").is_err());
    assert!(parse_mode("").is_err());
}

#[test]
fn column_specs_split_into_name_type_constraints() {
    let spec = parse_column_spec("id:INTEGER:PRIMARY KEY AUTOINCREMENT").expect("valid spec");
    assert_eq!(spec.name, "id");
    assert_eq!(spec.column_type, "INTEGER");
    assert_eq!(spec.constraints.as_deref(), Some("PRIMARY KEY AUTOINCREMENT"));

    let bare = parse_column_spec("name:TEXT").expect("valid spec");
    assert_eq!(bare.constraints, None);

    assert!(parse_column_spec("name").is_err());
    assert!(parse_column_spec(":TEXT").is_err());
    assert!(parse_column_spec("name:").is_err());
}

// ============================================================================
// SECTION: Backup Parsing
// ============================================================================

#[test]
fn rotation_flags_must_pair() {
    assert!(parse_rotation(None, None).expect("no rotation").is_none());
    assert!(parse_rotation(None, Some(3)).is_err());
    assert!(parse_rotation(Some("/backup/db.".to_string()), Some(0)).is_err());
    let policy = parse_rotation(Some("/backup/db.".to_string()), None)
        .expect("default keep")
        .expect("policy present");
    assert_eq!(policy.keep_count, 5);
}

// ============================================================================
// SECTION: Locale Resolution
// ============================================================================

#[test]
fn lang_flag_wins_over_environment() {
    let locale = resolve_locale(Some(LangArg::Ca), Some("en")).expect("flag locale");
    assert_eq!(locale, Locale::Ca);
}

#[test]
fn invalid_lang_environment_is_rejected() {
    assert!(resolve_locale(None, Some("klingon")).is_err());
    assert_eq!(resolve_locale(None, None).expect("default"), Locale::En);
    assert_eq!(resolve_locale(None, Some("ca_ES")).expect("env locale"), Locale::Ca);
}

// ============================================================================
// SECTION: Command Parsing
// ============================================================================

#[test]
fn query_command_parses_repeatable_options() {
    let cli = Cli::parse_from([
        "sqlite-steward",
        "query",
        "--db",
        "/tmp/example.db",
        "--query",
        "INSERT INTO users (name) VALUES (?)",
        "--param",
        "Ada",
        "--fetch",
        "none",
        "--no-transaction",
        "--pragma",
        "synchronous=FULL",
    ]);
    let Some(Commands::Query(command)) = cli.command else {
        panic!("expected a query command");
    };
    assert_eq!(command.params, vec!["Ada".to_string()]);
    assert!(command.no_transaction);
    assert_eq!(command.pragmas, vec!["synchronous=FULL".to_string()]);
}

#[test]
fn backup_command_defaults_to_verified_backup() {
    let cli = Cli::parse_from([
        "sqlite-steward",
        "backup",
        "--src",
        "/tmp/example.db",
        "--dest",
        "/tmp/example.backup.db",
    ]);
    let Some(Commands::Backup(command)) = cli.command else {
        panic!("expected a backup command");
    };
    assert!(!command.no_verify);
    assert!(!command.compress);
    assert!(command.rotate_pattern.is_none());
}
