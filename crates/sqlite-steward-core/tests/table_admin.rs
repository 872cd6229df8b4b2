// crates/sqlite-steward-core/tests/table_admin.rs
// ============================================================================
// Module: Table Administration Tests
// Description: Table lifecycle, inspection, and identifier enforcement.
// Purpose: Validate present/absent reconciliation and schema reporting.
// ============================================================================

//! ## Overview
//! Table management behavior under test:
//! - Create/drop lifecycle with idempotent reconciliation
//! - Info gathering (columns, row count, schema text)
//! - Reserved-word and injection-shaped identifier rejection
//! - Check-mode reporting without execution

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

use std::path::PathBuf;

use rusqlite::Connection;
use sqlite_steward_core::ColumnSpec;
use sqlite_steward_core::StewardError;
use sqlite_steward_core::TableRequest;
use sqlite_steward_core::TargetState;
use sqlite_steward_core::manage_table;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn empty_db(temp: &TempDir) -> PathBuf {
    let path = temp.path().join("tables.db");
    Connection::open(&path).expect("create database");
    path
}

fn users_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec {
            name: "id".to_string(),
            column_type: "INTEGER".to_string(),
            constraints: Some("PRIMARY KEY AUTOINCREMENT".to_string()),
        },
        ColumnSpec {
            name: "username".to_string(),
            column_type: "TEXT".to_string(),
            constraints: Some("NOT NULL UNIQUE".to_string()),
        },
        ColumnSpec {
            name: "email".to_string(),
            column_type: "TEXT".to_string(),
            constraints: None,
        },
    ]
}

fn create_request(db: &PathBuf) -> TableRequest {
    let mut request = TableRequest::new(db, "users");
    request.columns = users_columns();
    request
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn present_creates_a_missing_table() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    let report = manage_table(&create_request(&db)).expect("create table");
    assert!(report.changed);
    assert!(report.exists);

    let repeat = manage_table(&create_request(&db)).expect("reconcile table");
    assert!(!repeat.changed);
    assert!(repeat.exists);
}

#[test]
fn absent_drops_an_existing_table() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    manage_table(&create_request(&db)).expect("create table");

    let mut request = TableRequest::new(&db, "users");
    request.state = TargetState::Absent;
    let report = manage_table(&request).expect("drop table");
    assert!(report.changed);
    assert!(!report.exists);

    let repeat = manage_table(&request).expect("drop again");
    assert!(!repeat.changed);
}

#[test]
fn check_mode_reports_creation_without_executing() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    let mut request = create_request(&db);
    request.check_mode = true;
    let report = manage_table(&request).expect("check table");
    assert!(report.changed);
    assert!(report.exists, "report reflects the would-be state");

    let probe = manage_table(&TableRequest::new(&db, "users")).err();
    assert!(probe.is_some(), "creating without columns must fail, so the table is still absent");
}

#[test]
fn creating_without_columns_is_a_validation_failure() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    let Err(err) = manage_table(&TableRequest::new(&db, "users")) else {
        panic!("expected a create without columns to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
}

// ============================================================================
// SECTION: Inspection
// ============================================================================

#[test]
fn gather_info_reports_columns_rows_and_schema() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    manage_table(&create_request(&db)).expect("create table");
    {
        let connection = Connection::open(&db).expect("open database");
        connection
            .execute_batch(
                "INSERT INTO users (username, email) VALUES ('ada', 'ada@example.com');
                 INSERT INTO users (username, email) VALUES ('grace', 'grace@example.com');",
            )
            .expect("seed rows");
    }

    let mut request = create_request(&db);
    request.gather_info = true;
    let report = manage_table(&request).expect("gather info");
    assert_eq!(report.row_count, Some(2));
    let columns = report.columns.expect("column metadata");
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].name, "id");
    assert!(columns[0].primary_key);
    assert_eq!(columns[1].name, "username");
    assert!(columns[1].notnull);
    let schema = report.schema.expect("schema text");
    assert!(schema.starts_with("CREATE TABLE"));
    assert!(schema.contains("username"));
}

// ============================================================================
// SECTION: Identifier Enforcement
// ============================================================================

#[test]
fn reserved_table_names_are_rejected() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    let mut request = TableRequest::new(&db, "select");
    request.columns = users_columns();
    let Err(err) = manage_table(&request) else {
        panic!("expected a reserved table name to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
    assert!(err.to_string().contains("reserved keyword"));
}

#[test]
fn injection_shaped_column_names_are_rejected() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    let mut request = TableRequest::new(&db, "users");
    request.columns = vec![ColumnSpec {
        name: "name TEXT); DROP TABLE users; --".to_string(),
        column_type: "TEXT".to_string(),
        constraints: None,
    }];
    let Err(err) = manage_table(&request) else {
        panic!("expected an injection-shaped column name to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
}

#[test]
fn column_types_are_identifier_validated() {
    let temp = TempDir::new().expect("temp dir");
    let db = empty_db(&temp);
    let mut request = TableRequest::new(&db, "users");
    request.columns = vec![ColumnSpec {
        name: "name".to_string(),
        column_type: "VARCHAR(255)".to_string(),
        constraints: None,
    }];
    assert!(matches!(manage_table(&request), Err(StewardError::Validation(_))));
}

#[test]
fn missing_databases_fail_before_table_work() {
    let temp = TempDir::new().expect("temp dir");
    let missing = temp.path().join("absent.db");
    let Err(err) = manage_table(&TableRequest::new(&missing, "users")) else {
        panic!("expected a missing database to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
    assert!(err.to_string().contains("database file does not exist"));
}
