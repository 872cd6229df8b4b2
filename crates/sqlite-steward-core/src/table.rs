// crates/sqlite-steward-core/src/table.rs
// ============================================================================
// Module: Table Administration
// Description: Create, drop, and inspect tables in one database file.
// Purpose: Declarative present/absent table management with
//          identifier-validated SQL assembly.
// Dependencies: rusqlite, serde
// ============================================================================

//! ## Overview
//! [`manage_table`] reconciles one table toward a desired state. The table
//! name and every column name and type pass through identifier validation
//! before any SQL interpolation; column constraints are free text appended
//! verbatim, matching the declarative schema convention. `gather_info`
//! returns column metadata, the row count, and the stored schema text for
//! an existing table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;

use crate::connection::ConnectionSettings;
use crate::connection::open_connection;
use crate::database::TargetState;
use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;
use crate::identifiers::IdentifierKind;
use crate::identifiers::validate_identifier;
use crate::paths::ensure_database_exists;

// ============================================================================
// SECTION: Request Types
// ============================================================================

/// One column definition for table creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name; identifier-validated before use.
    pub name: String,
    /// Column type name; identifier-validated before use.
    pub column_type: String,
    /// Optional constraint text appended verbatim (e.g. `PRIMARY KEY`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
}

/// A table management request.
#[derive(Debug, Clone)]
pub struct TableRequest {
    /// Path to the database file; must already exist.
    pub db: PathBuf,
    /// Table name; identifier-validated before use.
    pub name: String,
    /// Desired presence.
    pub state: TargetState,
    /// Column definitions, required when creating.
    pub columns: Vec<ColumnSpec>,
    /// Use IF NOT EXISTS when creating.
    pub if_not_exists: bool,
    /// Gather column metadata, row count, and schema text.
    pub gather_info: bool,
    /// Report the would-be change without executing.
    pub check_mode: bool,
}

impl TableRequest {
    /// Creates a request defaulting to `present` with IF NOT EXISTS.
    pub fn new(db: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            name: name.into(),
            state: TargetState::Present,
            columns: Vec::new(),
            if_not_exists: true,
            gather_info: false,
            check_mode: false,
        }
    }
}

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// One column row from the table-info pragma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column index in the table.
    pub cid: i64,
    /// Column name.
    pub name: String,
    /// Declared column type.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Whether the column carries NOT NULL.
    pub notnull: bool,
    /// Declared default value, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

/// Result record for one table management request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    /// Table name.
    pub table: String,
    /// Whether the request changed the table.
    pub changed: bool,
    /// Whether the table exists after the request.
    pub exists: bool,
    /// Column metadata, when info was gathered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnInfo>>,
    /// Row count, when info was gathered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Stored CREATE TABLE text, when info was gathered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

// ============================================================================
// SECTION: Management
// ============================================================================

/// Reconciles one table toward the requested state.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] for a missing database file, an
/// unsafe table or column identifier, or a create request without columns;
/// [`StewardError::Connection`] when the database cannot be opened; and
/// [`StewardError::Operation`] when a statement fails.
pub fn manage_table(request: &TableRequest) -> Result<TableReport, StewardError> {
    ensure_database_exists(&request.db)?;
    validate_identifier(&request.name, IdentifierKind::Table)?;
    let connection = open_connection(&request.db, &ConnectionSettings::new())?;
    let exists = table_exists(&connection, &request.name)?;
    let mut report = TableReport {
        table: request.name.clone(),
        changed: false,
        exists,
        columns: None,
        row_count: None,
        schema: None,
    };

    if request.gather_info && exists {
        let (columns, row_count, schema) = gather_table_info(&connection, &request.name)?;
        report.columns = Some(columns);
        report.row_count = Some(row_count);
        report.schema = schema;
    }

    match request.state {
        TargetState::Present => {
            if !exists {
                if request.columns.is_empty() {
                    return Err(StewardError::Validation(
                        "columns are required when state is present".to_string(),
                    ));
                }
                report.changed = true;
                report.exists = true;
                if !request.check_mode {
                    create_table(&connection, request)?;
                }
            }
        }
        TargetState::Absent => {
            if exists {
                report.changed = true;
                report.exists = false;
                if !request.check_mode {
                    drop_table(&connection, &request.name)?;
                }
            }
        }
    }

    Ok(report)
}

/// Returns true when the named table exists.
///
/// # Errors
///
/// Returns [`StewardError::Operation`] when the catalog lookup fails.
pub fn table_exists(connection: &Connection, name: &str) -> Result<bool, StewardError> {
    connection
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |_row| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(|err| table_error("table lookup", name, err))
}

/// Gathers column metadata, the row count, and the stored schema text.
fn gather_table_info(
    connection: &Connection,
    name: &str,
) -> Result<(Vec<ColumnInfo>, u64, Option<String>), StewardError> {
    // The name was identifier-validated by the caller.
    let mut statement = connection
        .prepare(&format!("PRAGMA table_info({name})"))
        .map_err(|err| table_error("table inspection", name, err))?;
    let columns = statement
        .query_map([], |row| {
            Ok(ColumnInfo {
                cid: row.get(0)?,
                name: row.get(1)?,
                column_type: row.get(2)?,
                notnull: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|err| table_error("table inspection", name, err))?;
    let row_count: i64 = connection
        .query_row(&format!("SELECT COUNT(*) FROM {name}"), [], |row| row.get(0))
        .map_err(|err| table_error("table inspection", name, err))?;
    let schema: Option<String> = connection
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| table_error("table inspection", name, err))?;
    Ok((columns, u64::try_from(row_count).unwrap_or(0), schema))
}

/// Builds and executes the CREATE TABLE statement.
fn create_table(connection: &Connection, request: &TableRequest) -> Result<(), StewardError> {
    let mut definitions = Vec::with_capacity(request.columns.len());
    for column in &request.columns {
        validate_identifier(&column.name, IdentifierKind::Column)?;
        validate_identifier(&column.column_type, IdentifierKind::ColumnType)?;
        let mut definition = format!("{} {}", column.name, column.column_type);
        if let Some(constraints) = &column.constraints
            && !constraints.is_empty()
        {
            definition.push(' ');
            definition.push_str(constraints);
        }
        definitions.push(definition);
    }
    let clause = if request.if_not_exists { "IF NOT EXISTS " } else { "" };
    let sql = format!("CREATE TABLE {clause}{} ({})", request.name, definitions.join(", "));
    connection
        .execute_batch(&sql)
        .map_err(|err| table_error("table creation", &request.name, err))
}

/// Executes the DROP TABLE statement.
fn drop_table(connection: &Connection, name: &str) -> Result<(), StewardError> {
    connection
        .execute_batch(&format!("DROP TABLE {name}"))
        .map_err(|err| table_error("table removal", name, err))
}

/// Builds a normalized table operation failure.
fn table_error(operation: &str, name: &str, err: rusqlite::Error) -> StewardError {
    let context = ErrorContext::new().with("table", name);
    StewardError::operation(operation, &RawDbError::Sqlite(err), &context)
}
