// crates/sqlite-steward-core/src/identifiers.rs
// ============================================================================
// Module: SQL Identifier Validation
// Description: Syntactic and reserved-word checks for bare SQL identifiers.
// Purpose: Reject unsafe names before they are interpolated into SQL text.
// Dependencies: none beyond std
// ============================================================================

//! ## Overview
//! Table names, column names, column types, and pragma names are
//! interpolated into SQL text by the steward operations, so every candidate
//! passes through [`validate_identifier`] first. A valid identifier starts
//! with a letter or underscore, continues with letters, digits, or
//! underscores, and is not a reserved SQL keyword in any letter case.
//!
//! ## Invariants
//! - Validation is pure and side-effect free.
//! - A valid identifier is returned unchanged (case preserved).

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::StewardError;

// ============================================================================
// SECTION: Identifier Kinds
// ============================================================================

/// The role a candidate identifier plays, used in failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A table name.
    Table,
    /// A column name.
    Column,
    /// A column type name.
    ColumnType,
    /// An index name.
    Index,
    /// A pragma name.
    Pragma,
}

impl IdentifierKind {
    /// Returns the label used in validation failure messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Table => "table name",
            Self::Column => "column name",
            Self::ColumnType => "column type",
            Self::Index => "index name",
            Self::Pragma => "pragma name",
        }
    }
}

// ============================================================================
// SECTION: Reserved Words
// ============================================================================

/// Reserved SQL keywords that may not be used as bare identifiers.
///
/// # Invariants
/// - Entries are lowercase; membership checks lowercase the candidate.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "abort",
    "action",
    "add",
    "after",
    "all",
    "alter",
    "analyze",
    "and",
    "as",
    "asc",
    "attach",
    "autoincrement",
    "before",
    "begin",
    "between",
    "by",
    "cascade",
    "case",
    "cast",
    "check",
    "collate",
    "column",
    "commit",
    "conflict",
    "constraint",
    "create",
    "cross",
    "current_date",
    "current_time",
    "current_timestamp",
    "database",
    "default",
    "deferrable",
    "deferred",
    "delete",
    "desc",
    "detach",
    "distinct",
    "drop",
    "each",
    "else",
    "end",
    "escape",
    "except",
    "exclusive",
    "exists",
    "explain",
    "fail",
    "for",
    "foreign",
    "from",
    "full",
    "glob",
    "group",
    "having",
    "if",
    "ignore",
    "immediate",
    "in",
    "index",
    "indexed",
    "initially",
    "inner",
    "insert",
    "instead",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "key",
    "left",
    "like",
    "limit",
    "match",
    "natural",
    "no",
    "not",
    "notnull",
    "null",
    "of",
    "offset",
    "on",
    "or",
    "order",
    "outer",
    "plan",
    "pragma",
    "primary",
    "query",
    "raise",
    "recursive",
    "references",
    "regexp",
    "reindex",
    "release",
    "rename",
    "replace",
    "restrict",
    "right",
    "rollback",
    "row",
    "savepoint",
    "select",
    "set",
    "table",
    "temp",
    "temporary",
    "then",
    "to",
    "transaction",
    "trigger",
    "union",
    "unique",
    "update",
    "using",
    "vacuum",
    "values",
    "view",
    "virtual",
    "when",
    "where",
    "with",
    "without",
];

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a bare SQL identifier for the given role.
///
/// On success the identifier is returned unchanged.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] when the name is empty, contains a
/// character outside `[A-Za-z0-9_]`, starts with a digit, or is a reserved
/// keyword in any letter case.
pub fn validate_identifier(name: &str, kind: IdentifierKind) -> Result<&str, StewardError> {
    let label = kind.label();
    if name.is_empty() {
        return Err(StewardError::Validation(format!("SQL {label} cannot be empty")));
    }
    if !has_identifier_shape(name) {
        return Err(StewardError::Validation(format!(
            "invalid SQL {label}: '{name}'. Must start with a letter or underscore and contain \
             only letters, digits, and underscores"
        )));
    }
    let lowered = name.to_lowercase();
    if RESERVED_KEYWORDS.contains(&lowered.as_str()) {
        return Err(StewardError::Validation(format!(
            "SQL {label} '{name}' is a reserved keyword and cannot be used"
        )));
    }
    Ok(name)
}

/// Returns true when `name` matches `^[A-Za-z_][A-Za-z0-9_]*$`.
fn has_identifier_shape(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
