// crates/sqlite-steward-core/src/database.rs
// ============================================================================
// Module: Database Administration
// Description: Create, remove, and tune SQLite database files.
// Purpose: Declarative present/absent management with maintenance,
//          performance pragmas, and pre-change backups.
// Dependencies: rusqlite, serde, time
// ============================================================================

//! ## Overview
//! [`manage_database`] reconciles one database file toward a desired state.
//! Creating a missing file opens it with the default reliability pragmas and
//! stamps `user_version`; an existing file can receive permission bits,
//! maintenance (integrity check, VACUUM, ANALYZE), performance pragmas, and
//! a foreign-key toggle. Check mode reports the would-be change without
//! touching the filesystem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::connection::ConnectionSettings;
use crate::connection::open_connection;
use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;

// ============================================================================
// SECTION: Request Types
// ============================================================================

/// Journal modes accepted by the performance settings.
const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Desired presence of a managed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// The entity should exist.
    #[default]
    Present,
    /// The entity should not exist.
    Absent,
}

/// Maintenance operations to run against an existing database.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceOptions {
    /// Run VACUUM to reclaim space.
    pub vacuum: bool,
    /// Run ANALYZE to refresh query planner statistics.
    pub analyze: bool,
    /// Run the integrity-check pragma.
    pub integrity_check: bool,
}

impl MaintenanceOptions {
    /// Returns true when any maintenance operation is requested.
    #[must_use]
    pub const fn is_requested(self) -> bool {
        self.vacuum || self.analyze || self.integrity_check
    }
}

/// Performance pragma settings applied to an existing database.
#[derive(Debug, Clone, Default)]
pub struct PerformanceOptions {
    /// Journal mode (DELETE, TRUNCATE, PERSIST, MEMORY, WAL, OFF).
    pub journal_mode: Option<String>,
    /// Synchronous mode (0=OFF, 1=NORMAL, 2=FULL, 3=EXTRA).
    pub synchronous: Option<u8>,
    /// Cache size (negative for KiB, positive for pages).
    pub cache_size: Option<i64>,
    /// Temp store mode (0=DEFAULT, 1=FILE, 2=MEMORY).
    pub temp_store: Option<u8>,
}

impl PerformanceOptions {
    /// Returns true when any performance setting is requested.
    #[must_use]
    pub const fn is_requested(&self) -> bool {
        self.journal_mode.is_some()
            || self.synchronous.is_some()
            || self.cache_size.is_some()
            || self.temp_store.is_some()
    }
}

/// A database management request.
#[derive(Debug, Clone)]
pub struct DatabaseRequest {
    /// Path to the database file.
    pub path: PathBuf,
    /// Desired presence.
    pub state: TargetState,
    /// Optional Unix permission bits for the file.
    pub mode: Option<u32>,
    /// Create a timestamped sibling copy before making changes.
    pub backup_before: bool,
    /// Maintenance operations.
    pub maintenance: MaintenanceOptions,
    /// Performance pragma settings.
    pub performance: PerformanceOptions,
    /// Enable foreign-key constraint enforcement.
    pub foreign_keys: bool,
    /// Report the would-be change without touching the filesystem.
    pub check_mode: bool,
}

impl DatabaseRequest {
    /// Creates a request defaulting to `present` with foreign keys on.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: TargetState::Present,
            mode: None,
            backup_before: false,
            maintenance: MaintenanceOptions::default(),
            performance: PerformanceOptions::default(),
            foreign_keys: true,
            check_mode: false,
        }
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Per-operation maintenance results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    /// Integrity-check status string, typically `"ok"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_check: Option<String>,
    /// Whether VACUUM ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vacuum: Option<bool>,
    /// Whether ANALYZE ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyze: Option<bool>,
}

/// Applied performance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Journal mode reported back by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_mode: Option<String>,
    /// Applied synchronous mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synchronous: Option<u8>,
    /// Applied cache size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<i64>,
    /// Applied temp store mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_store: Option<u8>,
}

/// Result record for one database management request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseReport {
    /// Validated database path.
    pub path: String,
    /// Whether the request changed the database.
    pub changed: bool,
    /// Database file size in bytes (present state only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Path of the pre-change backup, when one was taken.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<String>,
    /// Maintenance results, when maintenance ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_results: Option<MaintenanceReport>,
    /// Performance results, when performance settings were applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_results: Option<PerformanceReport>,
    /// Foreign-key enforcement state read back from the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_keys_enabled: Option<bool>,
}

// ============================================================================
// SECTION: Management
// ============================================================================

/// Reconciles one database file toward the requested state.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] for unsafe paths or out-of-range
/// performance settings, [`StewardError::Connection`] when the database
/// cannot be opened, [`StewardError::Operation`] when a maintenance or
/// pragma statement fails, and [`StewardError::Io`] for filesystem
/// failures.
pub fn manage_database(request: &DatabaseRequest) -> Result<DatabaseReport, StewardError> {
    let path = crate::paths::validate_database_path(&request.path)?;
    let exists = path.is_file();
    let mut report = DatabaseReport {
        path: path.display().to_string(),
        changed: false,
        size: None,
        backup_file: None,
        maintenance_results: None,
        performance_results: None,
        foreign_keys_enabled: None,
    };

    if request.backup_before && exists && !request.check_mode {
        let backup_path = create_timestamped_backup(&path)?;
        report.backup_file = Some(backup_path.display().to_string());
    }

    match request.state {
        TargetState::Present => {
            if !exists {
                report.changed = true;
                if !request.check_mode {
                    create_database(&path)?;
                }
            }
            if !request.check_mode {
                report.size = Some(file_size(&path));
                if let Some(mode) = request.mode {
                    apply_file_mode(&path, mode)?;
                }
                if request.maintenance.is_requested() {
                    report.maintenance_results =
                        Some(run_maintenance(&path, request.maintenance)?);
                }
                if request.performance.is_requested() {
                    report.performance_results =
                        Some(apply_performance(&path, &request.performance)?);
                }
                report.foreign_keys_enabled =
                    Some(configure_foreign_keys(&path, request.foreign_keys)?);
            }
        }
        TargetState::Absent => {
            if exists {
                report.changed = true;
                if !request.check_mode {
                    fs::remove_file(&path).map_err(|err| {
                        let context =
                            ErrorContext::new().with("database_path", path.display());
                        StewardError::io("database removal", &RawDbError::Io(err), &context)
                    })?;
                }
            }
        }
    }

    Ok(report)
}

/// Creates a fresh database file with the default reliability pragmas.
fn create_database(path: &Path) -> Result<(), StewardError> {
    let connection = open_connection(path, &ConnectionSettings::new())?;
    connection.execute_batch("PRAGMA user_version = 1;").map_err(|err| {
        let context = ErrorContext::new().with("database_path", path.display());
        StewardError::operation("database creation", &RawDbError::Sqlite(err), &context)
    })
}

/// Creates a timestamped sibling copy of the database file.
fn create_timestamped_backup(path: &Path) -> Result<PathBuf, StewardError> {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .map_err(|err| {
            StewardError::io(
                "database backup",
                &RawDbError::Other(err.to_string()),
                &ErrorContext::new(),
            )
        })?;
    let backup_path = PathBuf::from(format!("{}.backup.{stamp}", path.display()));
    fs::copy(path, &backup_path).map_err(|err| {
        let context = ErrorContext::new()
            .with("database_path", path.display())
            .with("backup_path", backup_path.display());
        StewardError::io("database backup", &RawDbError::Io(err), &context)
    })?;
    Ok(backup_path)
}

/// Runs the requested maintenance operations in a fixed order.
fn run_maintenance(
    path: &Path,
    options: MaintenanceOptions,
) -> Result<MaintenanceReport, StewardError> {
    let connection = open_connection(path, &ConnectionSettings::new())?;
    let mut report = MaintenanceReport {
        integrity_check: None,
        vacuum: None,
        analyze: None,
    };
    if options.integrity_check {
        let status: String = connection
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|err| maintenance_error(path, "integrity_check", err))?;
        report.integrity_check = Some(status);
    }
    if options.vacuum {
        connection
            .execute_batch("VACUUM;")
            .map_err(|err| maintenance_error(path, "vacuum", err))?;
        report.vacuum = Some(true);
    }
    if options.analyze {
        connection
            .execute_batch("ANALYZE;")
            .map_err(|err| maintenance_error(path, "analyze", err))?;
        report.analyze = Some(true);
    }
    Ok(report)
}

/// Builds a normalized maintenance failure.
fn maintenance_error(path: &Path, step: &str, err: rusqlite::Error) -> StewardError {
    let context =
        ErrorContext::new().with("database_path", path.display()).with("step", step);
    StewardError::operation("database maintenance", &RawDbError::Sqlite(err), &context)
}

/// Applies and reports the requested performance pragmas.
fn apply_performance(
    path: &Path,
    options: &PerformanceOptions,
) -> Result<PerformanceReport, StewardError> {
    let connection = open_connection(path, &ConnectionSettings::new())?;
    let mut report = PerformanceReport {
        journal_mode: None,
        synchronous: None,
        cache_size: None,
        temp_store: None,
    };
    if let Some(journal_mode) = &options.journal_mode {
        let upper = journal_mode.to_uppercase();
        if !JOURNAL_MODES.contains(&upper.as_str()) {
            return Err(StewardError::Validation(format!(
                "invalid journal mode: '{journal_mode}'"
            )));
        }
        let applied: String = connection
            .query_row(&format!("PRAGMA journal_mode = {upper}"), [], |row| row.get(0))
            .map_err(|err| performance_error(path, "journal_mode", err))?;
        report.journal_mode = Some(applied);
    }
    if let Some(synchronous) = options.synchronous {
        if synchronous > 3 {
            return Err(StewardError::Validation(format!(
                "invalid synchronous mode: {synchronous}"
            )));
        }
        connection
            .execute_batch(&format!("PRAGMA synchronous = {synchronous};"))
            .map_err(|err| performance_error(path, "synchronous", err))?;
        report.synchronous = Some(synchronous);
    }
    if let Some(cache_size) = options.cache_size {
        connection
            .execute_batch(&format!("PRAGMA cache_size = {cache_size};"))
            .map_err(|err| performance_error(path, "cache_size", err))?;
        report.cache_size = Some(cache_size);
    }
    if let Some(temp_store) = options.temp_store {
        if temp_store > 2 {
            return Err(StewardError::Validation(format!(
                "invalid temp store mode: {temp_store}"
            )));
        }
        connection
            .execute_batch(&format!("PRAGMA temp_store = {temp_store};"))
            .map_err(|err| performance_error(path, "temp_store", err))?;
        report.temp_store = Some(temp_store);
    }
    Ok(report)
}

/// Builds a normalized performance failure.
fn performance_error(path: &Path, setting: &str, err: rusqlite::Error) -> StewardError {
    let context =
        ErrorContext::new().with("database_path", path.display()).with("setting", setting);
    StewardError::operation("performance optimization", &RawDbError::Sqlite(err), &context)
}

/// Toggles foreign-key enforcement and reads the applied state back.
fn configure_foreign_keys(path: &Path, enable: bool) -> Result<bool, StewardError> {
    let connection = open_connection(path, &ConnectionSettings::new())?;
    let value = if enable { "ON" } else { "OFF" };
    connection.execute_batch(&format!("PRAGMA foreign_keys = {value};")).map_err(|err| {
        foreign_keys_error(path, err)
    })?;
    let enabled: i64 = connection
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .map_err(|err| foreign_keys_error(path, err))?;
    Ok(enabled != 0)
}

/// Builds a normalized foreign-key configuration failure.
fn foreign_keys_error(path: &Path, err: rusqlite::Error) -> StewardError {
    let context = ErrorContext::new().with("database_path", path.display());
    StewardError::operation("foreign key configuration", &RawDbError::Sqlite(err), &context)
}

/// Returns the file size in bytes, or zero when unavailable.
fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map_or(0, |metadata| metadata.len())
}

/// Applies Unix permission bits to the database file.
#[cfg(unix)]
fn apply_file_mode(path: &Path, mode: u32) -> Result<(), StewardError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|err| {
        let context = ErrorContext::new()
            .with("database_path", path.display())
            .with("mode", format!("{mode:o}"));
        StewardError::io("database permissions", &RawDbError::Io(err), &context)
    })
}

/// Rejects permission changes on platforms without Unix mode bits.
#[cfg(not(unix))]
fn apply_file_mode(_path: &Path, _mode: u32) -> Result<(), StewardError> {
    Err(StewardError::Validation(
        "file mode is not supported on this platform".to_string(),
    ))
}
