// crates/sqlite-steward-core/src/deadline.rs
// ============================================================================
// Module: Execution Deadline
// Description: Runs a blocking execution job under a best-effort deadline.
// Purpose: Surface a distinct timeout failure when a statement never
//          finishes, without pretending the engine call was cancelled.
// Dependencies: std thread and mpsc
// ============================================================================

//! ## Overview
//! [`run_with_deadline`] executes a job on a named worker thread and waits
//! up to the configured limit. A zero limit means unbounded: the job runs
//! inline and the caller blocks until completion.
//!
//! Cancellation is best-effort only. When the deadline elapses the worker is
//! abandoned, not killed; the engine call may keep running against the
//! connection in the background. Callers hand the connection to the job by
//! value, so an abandoned worker also takes the only handle with it and a
//! timed-out connection can never be reused.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Deadline policy for one execution job.
///
/// # Invariants
/// - A zero limit means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Maximum wait before the job is abandoned.
    pub limit: Duration,
}

impl TimeoutPolicy {
    /// Creates a policy with the given limit (zero = unbounded).
    #[must_use]
    pub const fn new(limit: Duration) -> Self {
        Self {
            limit,
        }
    }

    /// Creates an unbounded policy.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            limit: Duration::ZERO,
        }
    }

    /// Returns true when the policy never expires.
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.limit.is_zero()
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            limit: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// SECTION: Deadline Runner
// ============================================================================

/// Runs `job` under the deadline policy.
///
/// Unbounded policies run the job inline. Bounded policies run it on a
/// worker thread and wait up to the limit; an expired deadline abandons the
/// worker.
///
/// # Errors
///
/// Returns [`StewardError::Timeout`] when the limit elapses before the job
/// finishes, [`StewardError::Io`] when the worker thread cannot be spawned,
/// or the job's own error when it fails in time.
pub fn run_with_deadline<T>(
    policy: TimeoutPolicy,
    operation: &str,
    job: impl FnOnce() -> Result<T, StewardError> + Send + 'static,
) -> Result<T, StewardError>
where
    T: Send + 'static,
{
    if policy.is_unbounded() {
        return job();
    }
    let (sender, receiver) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("steward-deadline".to_string())
        .spawn(move || {
            let _ = sender.send(job());
        })
        .map_err(|err| {
            StewardError::Io(format!("failed to spawn deadline worker thread: {err}"))
        })?;
    match receiver.recv_timeout(policy.limit) {
        Ok(outcome) => {
            let _ = handle.join();
            outcome
        }
        Err(RecvTimeoutError::Timeout) => Err(StewardError::timeout(operation, policy.limit)),
        Err(RecvTimeoutError::Disconnected) => Err(StewardError::operation(
            operation,
            &RawDbError::Other("deadline worker exited without a result".to_string()),
            &ErrorContext::new(),
        )),
    }
}
