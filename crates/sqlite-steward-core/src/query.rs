// crates/sqlite-steward-core/src/query.rs
// ============================================================================
// Module: Statement Executor
// Description: Executes SQL statements against one database file with
//              parameter binding, fetch policies, and mutation
//              classification.
// Purpose: The orchestration point for the query operation: one connection,
//          one request, retry and deadline wrappers around the engine call.
// Dependencies: rusqlite, serde, serde_json, base64
// ============================================================================

//! ## Overview
//! [`execute_query`] opens an exclusive connection for the duration of one
//! request, decides single- versus multi-statement execution, binds
//! positional parameters, fetches rows under the fetch-mode policy, and
//! classifies the statement as mutating or not. With a transaction enabled
//! it commits on success and rolls back on any failure; rollback errors are
//! swallowed in favor of the original error. The connection is released on
//! every exit path.
//!
//! Mutation classification is a plain substring test on the lowercased
//! statement text, not a tokenizer. A column literally named `update`
//! inside an otherwise read-only SELECT will misclassify `changed`; that
//! imprecision is part of the contract and must not be strengthened
//! silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rusqlite::Connection;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::connection::ConnectionSettings;
use crate::connection::open_connection;
use crate::deadline::TimeoutPolicy;
use crate::deadline::run_with_deadline;
use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;
use crate::paths::ensure_database_exists;
use crate::retry::RetryPolicy;
use crate::retry::execute_with_retry;

// ============================================================================
// SECTION: Classification Keywords
// ============================================================================

/// Row-mutating keywords used for `changed` classification.
const DML_KEYWORDS: &[&str] = &["insert", "update", "delete"];
/// Schema-mutating keywords used for `changed` classification.
const DDL_KEYWORDS: &[&str] = &["create", "drop", "alter"];

// ============================================================================
// SECTION: Request Types
// ============================================================================

/// Row-fetch policy for result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Fetch every row.
    #[default]
    All,
    /// Fetch a single row when present.
    One,
    /// Fetch nothing.
    None,
}

/// One statement execution request against one database file.
///
/// # Invariants
/// - Multi-statement SQL (more than one non-empty `;`-delimited segment)
///   must not carry parameters; that combination is a validation failure.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Path to the database file; must already exist.
    pub db: PathBuf,
    /// SQL text; semicolons delimit multiple statements.
    pub sql: String,
    /// Positional bind parameters for a single statement.
    pub parameters: Vec<JsonValue>,
    /// Row-fetch policy.
    pub fetch: FetchMode,
    /// Whether to wrap execution in a transaction.
    pub transaction: bool,
    /// Execution deadline (zero = unbounded).
    pub timeout: TimeoutPolicy,
    /// Retry policy for transient lock contention.
    pub retry: RetryPolicy,
    /// Connection pragma settings.
    pub settings: ConnectionSettings,
}

impl QueryRequest {
    /// Creates a request with default fetch, transaction, deadline, retry,
    /// and connection settings.
    pub fn new(db: impl Into<PathBuf>, sql: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            sql: sql.into(),
            parameters: Vec::new(),
            fetch: FetchMode::All,
            transaction: true,
            timeout: TimeoutPolicy::default(),
            retry: RetryPolicy::default(),
            settings: ConnectionSettings::new(),
        }
    }
}

/// Result record for one executed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Echo of the executed SQL text.
    pub query: String,
    /// Number of rows affected by the statement(s).
    #[serde(rename = "rowcount")]
    pub rows_affected: u64,
    /// Column names in source order; present only when rows were fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Fetched rows as value sequences in column order; present only when
    /// rows were fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<JsonValue>>>,
    /// Whether the database was modified.
    pub changed: bool,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Executes one request and assembles its result record.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] for a missing database file,
/// unbindable parameters, or parameters combined with multiple statements;
/// [`StewardError::Connection`] when the database cannot be opened;
/// [`StewardError::Operation`] when execution fails (possibly after
/// retries); and [`StewardError::Timeout`] when the deadline elapses.
pub fn execute_query(request: &QueryRequest) -> Result<QueryOutcome, StewardError> {
    ensure_database_exists(&request.db)?;
    let connection = open_connection(&request.db, &request.settings)?;
    if split_statements(&request.sql).len() > 1 && !request.parameters.is_empty() {
        return Err(StewardError::Validation(
            "parameters are not supported with multiple statements".to_string(),
        ));
    }
    let job_request = request.clone();
    run_with_deadline(request.timeout, "query execution", move || {
        run_statements(&connection, &job_request)
    })
}

/// Runs the execution job on the thread that owns the connection.
fn run_statements(
    connection: &Connection,
    request: &QueryRequest,
) -> Result<QueryOutcome, StewardError> {
    let transaction = if request.transaction {
        Some(connection.unchecked_transaction().map_err(|err| {
            StewardError::operation(
                "query execution",
                &RawDbError::Sqlite(err),
                &ErrorContext::new(),
            )
        })?)
    } else {
        None
    };
    match execute_inner(connection, request) {
        Ok(outcome) => {
            if let Some(transaction) = transaction {
                transaction.commit().map_err(|err| {
                    StewardError::operation(
                        "query execution",
                        &RawDbError::Sqlite(err),
                        &ErrorContext::new(),
                    )
                })?;
            }
            Ok(outcome)
        }
        Err(error) => {
            // Dropping the transaction rolls back; rollback failures are
            // swallowed in favor of the original error.
            drop(transaction);
            Err(error)
        }
    }
}

/// Executes the statement(s) and assembles the raw result fields.
fn execute_inner(
    connection: &Connection,
    request: &QueryRequest,
) -> Result<QueryOutcome, StewardError> {
    let sql = request.sql.as_str();
    let sql_lower = sql.to_lowercase();
    let segments = split_statements(sql);

    let mut columns = None;
    let mut rows = None;
    let rows_affected;
    let changed;

    if segments.len() > 1 {
        execute_with_retry(request.retry, sql, || connection.execute_batch(sql))?;
        rows_affected = connection.changes();
        changed = classify_script_changed(&segments);
    } else {
        let fetches = request.fetch != FetchMode::None && has_result_set(&sql_lower);
        if fetches {
            let (names, fetched) = fetch_rows(connection, request, sql)?;
            rows_affected = if contains_any(&sql_lower, DML_KEYWORDS) {
                connection.changes()
            } else {
                0
            };
            if !fetched.is_empty() {
                columns = Some(names);
                rows = Some(fetched);
            }
        } else {
            let count = execute_discarding_rows(connection, request, sql)?;
            rows_affected = if contains_any(&sql_lower, DML_KEYWORDS) { count } else { 0 };
        }
        changed = classify_single_changed(&sql_lower, rows_affected);
    }

    Ok(QueryOutcome {
        query: request.sql.clone(),
        rows_affected,
        columns,
        rows,
        changed,
    })
}

/// Executes one statement without collecting a result set.
///
/// Row-producing statements (SELECTs under a `none` fetch mode, pragmas,
/// DML with RETURNING) are stepped to completion with their rows discarded;
/// everything else runs through plain execution. Returns the affected-row
/// count reported by the engine.
fn execute_discarding_rows(
    connection: &Connection,
    request: &QueryRequest,
    sql: &str,
) -> Result<u64, StewardError> {
    let parameters = bind_parameters(&request.parameters)?;
    execute_with_retry(request.retry, sql, || {
        let mut statement = connection.prepare(sql)?;
        if statement.column_count() > 0 {
            let mut result_rows = statement.query(params_from_iter(parameters.iter()))?;
            while result_rows.next()?.is_some() {}
            drop(result_rows);
            Ok(connection.changes())
        } else {
            let count = statement.execute(params_from_iter(parameters.iter()))?;
            Ok(u64::try_from(count).unwrap_or(u64::MAX))
        }
    })
}

/// Runs the prepared-query path and collects rows under the fetch policy.
fn fetch_rows(
    connection: &Connection,
    request: &QueryRequest,
    sql: &str,
) -> Result<(Vec<String>, Vec<Vec<JsonValue>>), StewardError> {
    let parameters = bind_parameters(&request.parameters)?;
    let fetch = request.fetch;
    execute_with_retry(request.retry, sql, || {
        let mut statement = connection.prepare(sql)?;
        let names: Vec<String> =
            statement.column_names().iter().map(|name| (*name).to_string()).collect();
        let mut result_rows = statement.query(params_from_iter(parameters.iter()))?;
        let mut collected = Vec::new();
        while let Some(row) = result_rows.next()? {
            let mut values = Vec::with_capacity(names.len());
            for index in 0 .. names.len() {
                values.push(column_value(row.get_ref(index)?));
            }
            collected.push(values);
            if fetch == FetchMode::One {
                break;
            }
        }
        Ok((names, collected))
    })
}

// ============================================================================
// SECTION: Statement Analysis
// ============================================================================

/// Splits SQL text on `;`, trimming and discarding empty segments.
fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';').map(str::trim).filter(|segment| !segment.is_empty()).collect()
}

/// Returns true when the lowercased statement text can produce a result set.
fn has_result_set(sql_lower: &str) -> bool {
    let trimmed = sql_lower.trim();
    trimmed.starts_with("select") || trimmed.contains("returning")
}

/// Returns true when any keyword occurs as a substring of `text`.
fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Classifies `changed` for a single statement.
///
/// DML-shaped statements changed iff rows were affected; DDL-shaped
/// statements always changed; everything else is read-only.
fn classify_single_changed(sql_lower: &str, rows_affected: u64) -> bool {
    if contains_any(sql_lower, DML_KEYWORDS) {
        rows_affected > 0
    } else {
        contains_any(sql_lower, DDL_KEYWORDS)
    }
}

/// Classifies `changed` for a multi-statement script: true iff any segment
/// carries a mutating keyword.
fn classify_script_changed(segments: &[&str]) -> bool {
    segments.iter().any(|segment| {
        let lower = segment.to_lowercase();
        contains_any(&lower, DML_KEYWORDS) || contains_any(&lower, DDL_KEYWORDS)
    })
}

// ============================================================================
// SECTION: Value Mapping
// ============================================================================

/// Converts request parameters into engine bind values.
fn bind_parameters(parameters: &[JsonValue]) -> Result<Vec<SqlValue>, StewardError> {
    parameters.iter().map(bind_value).collect()
}

/// Converts one JSON parameter into an engine bind value.
fn bind_value(value: &JsonValue) -> Result<SqlValue, StewardError> {
    match value {
        JsonValue::Null => Ok(SqlValue::Null),
        JsonValue::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        JsonValue::Number(number) => number.as_i64().map(SqlValue::Integer).map_or_else(
            || {
                number.as_f64().map(SqlValue::Real).ok_or_else(|| {
                    StewardError::Validation(format!("unsupported numeric parameter: {number}"))
                })
            },
            Ok,
        ),
        JsonValue::String(text) => Ok(SqlValue::Text(text.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(StewardError::Validation(
            "query parameters must be scalar values".to_string(),
        )),
    }
}

/// Converts one engine column value into its JSON representation.
///
/// BLOB columns render as base64 text; non-finite REAL values render as
/// null because JSON has no representation for them.
fn column_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(number) => JsonValue::from(number),
        ValueRef::Real(number) => {
            serde_json::Number::from_f64(number).map_or(JsonValue::Null, JsonValue::Number)
        }
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => JsonValue::String(BASE64.encode(bytes)),
    }
}
