use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Raised when an operation does not settle within its allotted time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} timed out after {timeout_ms}ms")]
pub struct TimeoutError {
    pub operation: String,
    pub timeout_ms: u64,
}

impl TimeoutError {
    pub fn new(operation: impl Into<String>, timeout: Duration) -> Self {
        Self {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

/// Races `operation` against a deadline.
///
/// The operation's own output (success or error) is returned unchanged inside
/// `Ok`. If the deadline passes first the operation is dropped and a
/// `TimeoutError` is returned. A zero timeout fails without polling the
/// operation at all.
///
/// Dropping stops a Rust future, but any work it already handed off (a spawned
/// task, a request already on the wire) keeps running. Pass a cancellable
/// operation when that matters.
pub async fn with_timeout<F>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    if timeout.is_zero() {
        return Err(TimeoutError::new(operation_name, timeout));
    }

    // tokio::time::timeout owns the timer; it is released on both paths.
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| TimeoutError::new(operation_name, timeout))
}
