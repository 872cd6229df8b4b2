// crates/sqlite-steward-core/src/retry.rs
// ============================================================================
// Module: Transient Lock Retry
// Description: Re-issues statement execution on lock contention with
//              exponential backoff and bounded attempts.
// Purpose: Absorb short-lived SQLITE_BUSY/SQLITE_LOCKED windows without
//          masking real failures.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! [`execute_with_retry`] runs an engine call up to `max_retries + 1` times.
//! Only transient lock contention is retried; syntax errors, constraint
//! violations, and every other failure surface on the first attempt. That
//! asymmetry is a correctness requirement, not an oversight.
//!
//! ## Invariants
//! - Backoff doubles per attempt: `base_delay * 2^attempt`.
//! - The final lock failure is annotated with the truncated statement text,
//!   the retry budget, and a final-attempt marker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use rusqlite::ErrorCode;

use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Number of statement characters quoted in error context annotations.
const STATEMENT_CONTEXT_CHARS: usize = 100;

/// Retry policy for transient lock contention.
///
/// # Invariants
/// - `max_retries` bounds retries after the initial attempt; attempt
///   indices run `0..=max_retries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Returns true for failures expected to clear given a short wait.
///
/// A transient lock failure is an engine error carrying the busy or locked
/// result code, or whose message contains "database is locked" or "busy"
/// (case-insensitive).
#[must_use]
pub fn is_transient_lock_error(error: &rusqlite::Error) -> bool {
    if let rusqlite::Error::SqliteFailure(failure, _) = error
        && matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    {
        return true;
    }
    let message = error.to_string().to_lowercase();
    message.contains("database is locked") || message.contains("busy")
}

// ============================================================================
// SECTION: Retry Loop
// ============================================================================

/// Runs `op` under the retry policy, sleeping between lock-contention
/// attempts.
///
/// `statement` is only used to annotate failures (truncated to the first
/// 100 characters).
///
/// # Errors
///
/// Returns [`StewardError::Operation`] immediately for non-transient
/// failures (annotated with the 1-based attempt number), or after the retry
/// budget is exhausted for persistent lock contention (annotated with
/// `max_retries` and `final_attempt=true`).
pub fn execute_with_retry<T>(
    policy: RetryPolicy,
    statement: &str,
    mut op: impl FnMut() -> Result<T, rusqlite::Error>,
) -> Result<T, StewardError> {
    for attempt in 0 ..= policy.max_retries {
        let error = match op() {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !is_transient_lock_error(&error) {
            let context = ErrorContext::new()
                .with("query", truncate_statement(statement))
                .with("attempt", attempt + 1);
            return Err(StewardError::operation(
                "query execution",
                &RawDbError::Sqlite(error),
                &context,
            ));
        }
        if attempt < policy.max_retries {
            thread::sleep(backoff_delay(policy.base_delay, attempt));
            continue;
        }
        let context = ErrorContext::new()
            .with("query", truncate_statement(statement))
            .with("max_retries", policy.max_retries)
            .with("final_attempt", true);
        return Err(StewardError::operation(
            "query execution",
            &RawDbError::Sqlite(error),
            &context,
        ));
    }
    // The inclusive range always yields at least one attempt, so every path
    // above has already returned.
    Err(StewardError::Operation("retry loop yielded no attempt".to_string()))
}

/// Returns the exponential backoff delay for `attempt`.
fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay.saturating_mul(2_u32.saturating_pow(attempt))
}

/// Truncates statement text for error context annotations.
fn truncate_statement(statement: &str) -> String {
    statement.chars().take(STATEMENT_CONTEXT_CHARS).collect()
}
