// crates/sqlite-steward-core/tests/database_admin.rs
// ============================================================================
// Module: Database Administration Tests
// Description: Lifecycle, maintenance, performance, and permission handling
//              for managed database files.
// Purpose: Validate present/absent reconciliation and the tuning paths.
// ============================================================================

//! ## Overview
//! Database management behavior under test:
//! - Create-on-missing and remove-on-absent with check-mode reporting
//! - Maintenance results (integrity check, VACUUM, ANALYZE)
//! - Performance pragma application and range validation
//! - Pre-change backups and Unix permission bits
//! - Path safety rejections

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

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use sqlite_steward_core::DatabaseRequest;
use sqlite_steward_core::MaintenanceOptions;
use sqlite_steward_core::PerformanceOptions;
use sqlite_steward_core::StewardError;
use sqlite_steward_core::TargetState;
use sqlite_steward_core::manage_database;
use sqlite_steward_core::verify_database;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn db_path(temp: &TempDir) -> PathBuf {
    temp.path().join("managed.db")
}

fn created_db(temp: &TempDir) -> PathBuf {
    let path = db_path(temp);
    let request = DatabaseRequest::new(&path);
    manage_database(&request).expect("create database");
    path
}

fn backup_siblings(path: &Path) -> Vec<PathBuf> {
    let parent = path.parent().expect("parent dir");
    let prefix = format!("{}.backup.", path.file_name().expect("file name").to_string_lossy());
    fs::read_dir(parent)
        .expect("read dir")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|candidate| {
            candidate.file_name().is_some_and(|name| {
                name.to_string_lossy().starts_with(&prefix)
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn present_creates_a_missing_database() {
    let temp = TempDir::new().expect("temp dir");
    let path = db_path(&temp);
    let report = manage_database(&DatabaseRequest::new(&path)).expect("create database");
    assert!(report.changed);
    assert!(path.is_file());
    assert!(report.size.is_some_and(|size| size > 0));
    assert_eq!(report.foreign_keys_enabled, Some(true));
    assert!(verify_database(&path));
}

#[test]
fn present_on_an_existing_database_reports_unchanged() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let report = manage_database(&DatabaseRequest::new(&path)).expect("reconcile database");
    assert!(!report.changed);
    assert!(path.is_file());
}

#[test]
fn check_mode_reports_creation_without_creating() {
    let temp = TempDir::new().expect("temp dir");
    let path = db_path(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.check_mode = true;
    let report = manage_database(&request).expect("check database");
    assert!(report.changed);
    assert!(!path.exists());
}

#[test]
fn absent_removes_an_existing_database() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.state = TargetState::Absent;
    let report = manage_database(&request).expect("remove database");
    assert!(report.changed);
    assert!(!path.exists());

    let repeat = manage_database(&request).expect("remove again");
    assert!(!repeat.changed);
}

// ============================================================================
// SECTION: Maintenance
// ============================================================================

#[test]
fn maintenance_reports_each_requested_operation() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.maintenance = MaintenanceOptions {
        vacuum: true,
        analyze: true,
        integrity_check: true,
    };
    let report = manage_database(&request).expect("run maintenance");
    let maintenance = report.maintenance_results.expect("maintenance results");
    assert_eq!(maintenance.integrity_check.as_deref(), Some("ok"));
    assert_eq!(maintenance.vacuum, Some(true));
    assert_eq!(maintenance.analyze, Some(true));
}

// ============================================================================
// SECTION: Performance
// ============================================================================

#[test]
fn performance_settings_apply_and_report() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.performance = PerformanceOptions {
        journal_mode: Some("delete".to_string()),
        synchronous: Some(1),
        cache_size: Some(-8192),
        temp_store: Some(2),
    };
    let report = manage_database(&request).expect("apply performance settings");
    let performance = report.performance_results.expect("performance results");
    assert_eq!(performance.journal_mode.as_deref(), Some("delete"));
    assert_eq!(performance.synchronous, Some(1));
    assert_eq!(performance.cache_size, Some(-8192));
    assert_eq!(performance.temp_store, Some(2));
}

#[test]
fn out_of_range_performance_settings_are_rejected() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);

    let mut request = DatabaseRequest::new(&path);
    request.performance.journal_mode = Some("JOURNALED".to_string());
    assert!(matches!(manage_database(&request), Err(StewardError::Validation(_))));

    let mut request = DatabaseRequest::new(&path);
    request.performance.synchronous = Some(7);
    assert!(matches!(manage_database(&request), Err(StewardError::Validation(_))));

    let mut request = DatabaseRequest::new(&path);
    request.performance.temp_store = Some(9);
    assert!(matches!(manage_database(&request), Err(StewardError::Validation(_))));
}

#[test]
fn foreign_keys_can_be_disabled() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.foreign_keys = false;
    let report = manage_database(&request).expect("disable foreign keys");
    assert_eq!(report.foreign_keys_enabled, Some(false));
}

// ============================================================================
// SECTION: Backups And Permissions
// ============================================================================

#[test]
fn backup_before_creates_a_timestamped_sibling() {
    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.backup_before = true;
    let report = manage_database(&request).expect("backup before change");
    let backup_file = report.backup_file.expect("backup file");
    assert!(Path::new(&backup_file).is_file());
    assert_eq!(backup_siblings(&path).len(), 1);
}

#[cfg(unix)]
#[test]
fn mode_bits_apply_to_the_database_file() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("temp dir");
    let path = created_db(&temp);
    let mut request = DatabaseRequest::new(&path);
    request.mode = Some(0o600);
    manage_database(&request).expect("apply mode");
    let mode = fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ============================================================================
// SECTION: Path Safety
// ============================================================================

#[test]
fn relative_paths_are_rejected() {
    let request = DatabaseRequest::new("relative/managed.db");
    let Err(err) = manage_database(&request) else {
        panic!("expected a relative path to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
}

#[test]
fn traversal_paths_are_rejected() {
    let temp = TempDir::new().expect("temp dir");
    let sneaky = temp.path().join("..").join("managed.db");
    let Err(err) = manage_database(&DatabaseRequest::new(sneaky)) else {
        panic!("expected a traversal path to fail");
    };
    assert!(matches!(err, StewardError::Validation(_)));
    assert!(err.to_string().contains("directory traversal detected"));
}
