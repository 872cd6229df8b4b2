// crates/sqlite-steward-core/src/connection.rs
// ============================================================================
// Module: Connection Setup
// Description: Opens SQLite connections with the default reliability pragmas.
// Purpose: One explicit pragma configuration, merged key-by-key with caller
//          overrides. No ambient global state.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! Every steward operation opens its own connection through
//! [`open_connection`]. The default pragma set enables foreign-key
//! enforcement, WAL journaling, normal sync, an in-memory temp store, and a
//! fixed memory-map size; caller overrides win per-key and unknown override
//! keys are appended after the defaults in insertion order.
//!
//! ## Invariants
//! - Pragma names and values are validated before interpolation.
//! - Merged pragma order is deterministic: defaults first, new keys after.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rusqlite::Connection;
use rusqlite::OpenFlags;

use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;
use crate::identifiers::IdentifierKind;
use crate::identifiers::validate_identifier;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default pragma set applied to every connection, in application order.
const DEFAULT_PRAGMAS: &[(&str, &str)] = &[
    ("foreign_keys", "ON"),
    ("journal_mode", "WAL"),
    ("synchronous", "NORMAL"),
    ("temp_store", "MEMORY"),
    // 256 MiB memory map.
    ("mmap_size", "268435456"),
];

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Connection configuration: the default pragma set plus caller overrides.
///
/// # Invariants
/// - Overrides are applied key-by-key; an override for a default key
///   replaces its value in place, preserving the default ordering.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    /// Ordered pragma overrides supplied by the caller.
    overrides: Vec<(String, String)>,
}

impl ConnectionSettings {
    /// Creates settings with the default pragma set and no overrides.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            overrides: Vec::new(),
        }
    }

    /// Adds or replaces a pragma override.
    pub fn override_pragma(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.overrides.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
            return;
        }
        self.overrides.push((name, value));
    }

    /// Returns the merged pragma list: defaults with overrides applied.
    #[must_use]
    pub fn merged_pragmas(&self) -> Vec<(String, String)> {
        let mut merged: Vec<(String, String)> = DEFAULT_PRAGMAS
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        for (name, value) in &self.overrides {
            if let Some(entry) = merged.iter_mut().find(|(key, _)| key == name) {
                entry.1.clone_from(value);
            } else {
                merged.push((name.clone(), value.clone()));
            }
        }
        merged
    }
}

// ============================================================================
// SECTION: Opening
// ============================================================================

/// Opens a connection to `path` and applies the merged pragma set.
///
/// # Errors
///
/// Returns [`StewardError::Connection`] when the database cannot be opened
/// or a pragma cannot be applied, and [`StewardError::Validation`] when an
/// override carries an unsafe pragma name or value.
pub fn open_connection(
    path: &Path,
    settings: &ConnectionSettings,
) -> Result<Connection, StewardError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags).map_err(|err| {
        let context = ErrorContext::new().with("database_path", path.display());
        StewardError::connection("database connection", &RawDbError::Sqlite(err), &context)
    })?;
    apply_pragmas(&connection, path, settings)?;
    Ok(connection)
}

/// Applies the merged pragma set to a freshly opened connection.
fn apply_pragmas(
    connection: &Connection,
    path: &Path,
    settings: &ConnectionSettings,
) -> Result<(), StewardError> {
    for (name, value) in settings.merged_pragmas() {
        validate_identifier(&name, IdentifierKind::Pragma)?;
        validate_pragma_value(&value)?;
        connection.execute_batch(&format!("PRAGMA {name} = {value};")).map_err(|err| {
            let context = ErrorContext::new()
                .with("database_path", path.display())
                .with("pragma", &name);
            StewardError::connection("database connection", &RawDbError::Sqlite(err), &context)
        })?;
    }
    Ok(())
}

/// Rejects pragma values that could escape the assignment expression.
fn validate_pragma_value(value: &str) -> Result<(), StewardError> {
    let safe = !value.is_empty()
        && value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if safe {
        return Ok(());
    }
    Err(StewardError::Validation(format!("invalid pragma value: '{value}'")))
}
