// crates/sqlite-steward-core/src/paths.rs
// ============================================================================
// Module: Database Path Validation
// Description: Safety checks for user-supplied database file paths.
// Purpose: Reject traversal and symlink indirection before any file access.
// Dependencies: std filesystem
// ============================================================================

//! ## Overview
//! Database paths arrive from untrusted callers. [`validate_database_path`]
//! rejects relative paths, parent-directory segments, and paths whose
//! resolved real path differs from the literal input, returning the
//! canonical absolute path. [`ensure_database_exists`] gates operations that
//! require an existing database file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::error::StewardError;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a database file path for safety.
///
/// Existing paths are canonicalized and must resolve to themselves; paths
/// that do not exist yet are accepted as-is so databases can be created.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] when the path is empty, relative,
/// contains a parent-directory segment, or resolves through a symlink to a
/// different location.
pub fn validate_database_path(path: &Path) -> Result<PathBuf, StewardError> {
    if path.as_os_str().is_empty() {
        return Err(StewardError::Validation("database path cannot be empty".to_string()));
    }
    if path.components().any(|component| matches!(component, Component::ParentDir)) {
        return Err(StewardError::Validation(format!(
            "directory traversal detected in path: {}",
            path.display()
        )));
    }
    if !path.is_absolute() {
        return Err(StewardError::Validation(format!(
            "database path must be absolute: {}",
            path.display()
        )));
    }
    if path.exists() {
        let resolved = fs::canonicalize(path).map_err(|err| {
            StewardError::Validation(format!("invalid database path: {err}"))
        })?;
        if resolved != path {
            return Err(StewardError::Validation(format!(
                "directory traversal detected in path: {}",
                path.display()
            )));
        }
        return Ok(resolved);
    }
    Ok(path.to_path_buf())
}

/// Requires `path` to be an existing regular file.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] when the database file is missing.
pub fn ensure_database_exists(path: &Path) -> Result<(), StewardError> {
    if path.is_file() {
        return Ok(());
    }
    Err(StewardError::Validation(format!(
        "database file does not exist: {}",
        path.display()
    )))
}
