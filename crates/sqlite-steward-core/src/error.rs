// crates/sqlite-steward-core/src/error.rs
// ============================================================================
// Module: Steward Error Taxonomy
// Description: Categorized errors and the normalized message builder.
// Purpose: Keep failure reporting uniform across every steward operation.
// Dependencies: rusqlite, thiserror
// ============================================================================

//! ## Overview
//! Every failure surfaced by this crate is one of a small set of categories:
//! validation, connection, operation, timeout, or filesystem. Messages are
//! built through [`standardize_error_message`] so the operation name, the
//! failure category, and any contextual key/value annotations are always
//! present in the same shape.
//!
//! ## Invariants
//! - Validation failures are never retried.
//! - Context annotations render in insertion order.
//! - Message construction never fails and never panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Steward operation errors.
///
/// # Invariants
/// - Carried messages are already normalized and safe for boundary display.
#[derive(Debug, Error)]
pub enum StewardError {
    /// Bad identifier, path, or parameter shape. Never retried.
    #[error("{0}")]
    Validation(String),
    /// The database handle could not be opened or configured.
    #[error("{0}")]
    Connection(String),
    /// A statement execution failed, possibly after retries.
    #[error("{0}")]
    Operation(String),
    /// The deadline elapsed while waiting for a statement.
    #[error("SQLite {operation} failed: statement timed out after {limit_secs} seconds")]
    Timeout {
        /// Operation label used in the message.
        operation: String,
        /// The elapsed limit in seconds.
        limit_secs: f64,
    },
    /// Filesystem failure outside the engine.
    #[error("{0}")]
    Io(String),
}

impl StewardError {
    /// Builds a normalized [`StewardError::Connection`] error.
    #[must_use]
    pub fn connection(operation: &str, raw: &RawDbError, context: &ErrorContext) -> Self {
        Self::Connection(standardize_error_message(operation, raw, context))
    }

    /// Builds a normalized [`StewardError::Operation`] error.
    #[must_use]
    pub fn operation(operation: &str, raw: &RawDbError, context: &ErrorContext) -> Self {
        Self::Operation(standardize_error_message(operation, raw, context))
    }

    /// Builds a normalized [`StewardError::Io`] error.
    #[must_use]
    pub fn io(operation: &str, raw: &RawDbError, context: &ErrorContext) -> Self {
        Self::Io(standardize_error_message(operation, raw, context))
    }

    /// Builds a [`StewardError::Timeout`] error for an elapsed deadline.
    #[must_use]
    pub fn timeout(operation: &str, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            limit_secs: limit.as_secs_f64(),
        }
    }
}

// ============================================================================
// SECTION: Raw Failure Source
// ============================================================================

/// Raw failure consumed by the error normalizer.
///
/// # Invariants
/// - Classification inspects the variant, not the rendered message.
#[derive(Debug)]
pub enum RawDbError {
    /// Engine-level failure reported by rusqlite.
    Sqlite(rusqlite::Error),
    /// Filesystem failure reported by std I/O.
    Io(std::io::Error),
    /// Failure outside both the engine and the filesystem.
    Other(String),
}

impl fmt::Display for RawDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(error) => error.fmt(f),
            Self::Io(error) => error.fmt(f),
            Self::Other(message) => message.fmt(f),
        }
    }
}

/// Classifies a raw failure into a fixed human-readable category.
///
/// Most specific category wins; anything unrecognized falls through to
/// "Unexpected error".
fn classify(raw: &RawDbError) -> &'static str {
    match raw {
        RawDbError::Sqlite(error) => match error {
            rusqlite::Error::SqliteFailure(failure, _) => {
                if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                    "Integrity constraint violation"
                } else {
                    "Database operation error"
                }
            }
            _ => "Database error",
        },
        RawDbError::Io(error) => {
            if error.kind() == std::io::ErrorKind::PermissionDenied {
                "Permission error"
            } else {
                "File system error"
            }
        }
        RawDbError::Other(_) => "Unexpected error",
    }
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Ordered key/value annotations attached to normalized messages.
///
/// # Invariants
/// - Entries render in insertion order.
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    /// Insertion-ordered annotation entries.
    entries: Vec<(String, String)>,
}

impl ErrorContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an annotation, returning the context for chaining.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.entries.push((key.to_string(), value.to_string()));
        self
    }

    /// Returns true when no annotations are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates annotations in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

// ============================================================================
// SECTION: Normalizer
// ============================================================================

/// Builds the standardized failure message for an operation.
///
/// The shape is `"SQLite <operation> failed: <category> - <raw message>"`,
/// with `"(Context: k=v, ...)"` appended when annotations exist.
#[must_use]
pub fn standardize_error_message(
    operation: &str,
    raw: &RawDbError,
    context: &ErrorContext,
) -> String {
    let category = classify(raw);
    let mut message = format!("SQLite {operation} failed: {category} - {raw}");
    if !context.is_empty() {
        message.push_str(" (Context: ");
        for (index, (key, value)) in context.entries().enumerate() {
            if index > 0 {
                message.push_str(", ");
            }
            message.push_str(key);
            message.push('=');
            message.push_str(value);
        }
        message.push(')');
    }
    message
}
