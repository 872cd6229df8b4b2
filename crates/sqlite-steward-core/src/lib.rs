// crates/sqlite-steward-core/src/lib.rs
// ============================================================================
// Module: SQLite Steward Core
// Description: Single-purpose SQLite stewardship operations.
// Purpose: Execute SQL, manage database files and tables, and back up,
//          restore, and verify databases with normalized error reporting.
// Dependencies: rusqlite, serde, serde_json, thiserror, flate2, sha2, time,
//               base64
// ============================================================================

//! ## Overview
//! This crate wraps the embedded SQLite engine with a small set of
//! declarative operations: statement execution with retry and deadline
//! wrappers, database file lifecycle management, table management, and
//! backup/restore/verify. Each operation validates its inputs, opens its
//! own connection for the duration of one call, and reports a structured
//! result record suitable for JSON rendering at the invocation boundary.
//!
//! ## Invariants
//! - Connections are never shared across operations; each call opens and
//!   releases its own handle on every exit path.
//! - All failure messages flow through the error normalizer.

/// Backup, restore, and verify operations.
pub mod backup;
/// Connection setup with default reliability pragmas.
pub mod connection;
/// Database file lifecycle and tuning.
pub mod database;
/// Best-effort execution deadlines.
pub mod deadline;
/// Error taxonomy and the normalized message builder.
pub mod error;
/// Bare SQL identifier validation.
pub mod identifiers;
/// Database path safety checks.
pub mod paths;
/// The statement executor.
pub mod query;
/// Transient lock retry.
pub mod retry;
/// Table lifecycle and inspection.
pub mod table;

pub use backup::BackupOperation;
pub use backup::BackupReport;
pub use backup::BackupRequest;
pub use backup::RotationPolicy;
pub use backup::run_backup;
pub use backup::verify_database;
pub use connection::ConnectionSettings;
pub use connection::open_connection;
pub use database::DatabaseReport;
pub use database::DatabaseRequest;
pub use database::MaintenanceOptions;
pub use database::MaintenanceReport;
pub use database::PerformanceOptions;
pub use database::PerformanceReport;
pub use database::TargetState;
pub use database::manage_database;
pub use deadline::TimeoutPolicy;
pub use deadline::run_with_deadline;
pub use error::ErrorContext;
pub use error::RawDbError;
pub use error::StewardError;
pub use error::standardize_error_message;
pub use identifiers::IdentifierKind;
pub use identifiers::RESERVED_KEYWORDS;
pub use identifiers::validate_identifier;
pub use paths::ensure_database_exists;
pub use paths::validate_database_path;
pub use query::FetchMode;
pub use query::QueryOutcome;
pub use query::QueryRequest;
pub use query::execute_query;
pub use retry::RetryPolicy;
pub use retry::execute_with_retry;
pub use retry::is_transient_lock_error;
pub use table::ColumnInfo;
pub use table::ColumnSpec;
pub use table::TableReport;
pub use table::TableRequest;
pub use table::manage_table;
pub use table::table_exists;
