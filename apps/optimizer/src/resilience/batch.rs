//! Bounded batch executor.
//!
//! Drives an ordered list of items through a caller-supplied async processor,
//! one at a time, under a per-item timeout and a global time budget, pausing
//! between items to pace calls to a rate-limited dependency.
//!
//! Items never run concurrently: the pause between them is the throttle.
//! The executor does not retry. Wrap the processor with
//! `retry_with_timeout` for that.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::timeout::{with_timeout, TimeoutError};

pub const DEFAULT_PER_ITEM_TIMEOUT_MS: u64 = 2000;
/// Added on top of `items * per_item_timeout_ms` for the default total budget.
pub const TOTAL_TIMEOUT_BUFFER_MS: u64 = 5000;
pub const DEFAULT_INTER_ITEM_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub per_item_timeout_ms: Option<u64>,
    pub total_timeout_ms: Option<u64>,
    /// Pause between items; never applied after the last one.
    pub inter_item_delay_ms: u64,
    pub fail_fast: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            per_item_timeout_ms: None,
            total_timeout_ms: None,
            inter_item_delay_ms: DEFAULT_INTER_ITEM_DELAY_MS,
            fail_fast: true,
        }
    }
}

impl BatchOptions {
    pub fn per_item_timeout_ms(&self) -> u64 {
        self.per_item_timeout_ms
            .unwrap_or(DEFAULT_PER_ITEM_TIMEOUT_MS)
    }

    pub fn total_timeout_ms(&self, item_count: usize) -> u64 {
        self.total_timeout_ms.unwrap_or_else(|| {
            self.per_item_timeout_ms()
                .saturating_mul(item_count as u64)
                .saturating_add(TOTAL_TIMEOUT_BUFFER_MS)
        })
    }
}

/// Why an item did not produce a value. Every variant names the 0-based index
/// of the item it concerns.
#[derive(Debug, Error)]
pub enum BatchError<E> {
    #[error("{source}")]
    Timeout {
        index: usize,
        total: usize,
        source: TimeoutError,
    },

    #[error("item {}/{} failed: {source}", .index + 1, .total)]
    Item { index: usize, total: usize, source: E },

    #[error(
        "batch time budget exhausted before item {}: {elapsed_ms}ms elapsed of {total_timeout_ms}ms",
        .index + 1
    )]
    BudgetExceeded {
        index: usize,
        elapsed_ms: u64,
        total_timeout_ms: u64,
    },
}

impl<E> BatchError<E> {
    #[allow(dead_code)]
    pub fn index(&self) -> usize {
        match self {
            BatchError::Timeout { index, .. }
            | BatchError::Item { index, .. }
            | BatchError::BudgetExceeded { index, .. } => *index,
        }
    }
}

/// One slot of the result, in input order.
#[derive(Debug)]
pub enum BatchEntry<R, E> {
    Success(R),
    Failure { index: usize, error: BatchError<E> },
}

impl<R, E> BatchEntry<R, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchEntry::Success(_))
    }

    #[allow(dead_code)]
    pub fn value(&self) -> Option<&R> {
        match self {
            BatchEntry::Success(value) => Some(value),
            BatchEntry::Failure { .. } => None,
        }
    }

    #[allow(dead_code)]
    pub fn error(&self) -> Option<&BatchError<E>> {
        match self {
            BatchEntry::Success(_) => None,
            BatchEntry::Failure { error, .. } => Some(error),
        }
    }
}

/// Runs `processor` over `items` in order.
///
/// With `fail_fast` the first failure (timeout, processor error or exhausted
/// budget) is returned as `Err` and no later item runs. Without it, failures
/// become `BatchEntry::Failure` slots and the returned vector always has one
/// entry per input item.
///
/// Before each item the remaining budget is checked: once less than one
/// per-item timeout is left, the item is not started and the batch stops.
pub async fn execute_batch<T, R, E, F, Fut>(
    items: Vec<T>,
    mut processor: F,
    options: &BatchOptions,
) -> Result<Vec<BatchEntry<R, E>>, BatchError<E>>
where
    F: FnMut(T, usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: fmt::Display,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let per_item_timeout_ms = options.per_item_timeout_ms();
    let per_item_timeout = Duration::from_millis(per_item_timeout_ms);
    let total_timeout_ms = options.total_timeout_ms(total);
    let start = Instant::now();
    let mut results = Vec::with_capacity(total);

    debug!(
        "Starting batch of {total} items (per item {per_item_timeout_ms}ms, total {total_timeout_ms}ms, fail_fast={})",
        options.fail_fast
    );

    for (index, item) in items.into_iter().enumerate() {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms >= total_timeout_ms.saturating_sub(per_item_timeout_ms) {
            let exceeded = |index| BatchError::BudgetExceeded {
                index,
                elapsed_ms,
                total_timeout_ms,
            };
            warn!(
                "Batch budget exhausted at item {}/{total} ({elapsed_ms}ms of {total_timeout_ms}ms)",
                index + 1
            );
            if options.fail_fast {
                return Err(exceeded(index));
            }
            results.extend((index..total).map(|i| BatchEntry::Failure {
                index: i,
                error: exceeded(i),
            }));
            break;
        }

        let operation_name = format!("item {}/{}", index + 1, total);
        debug!("Processing {operation_name}");

        let outcome = match with_timeout(processor(item, index), per_item_timeout, &operation_name)
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(BatchError::Item {
                index,
                total,
                source,
            }),
            Err(source) => Err(BatchError::Timeout {
                index,
                total,
                source,
            }),
        };

        match outcome {
            Ok(value) => {
                debug!("Finished {operation_name}");
                results.push(BatchEntry::Success(value));
            }
            Err(error) => {
                warn!("{error}");
                if options.fail_fast {
                    return Err(error);
                }
                results.push(BatchEntry::Failure { index, error });
            }
        }

        if index + 1 < total && options.inter_item_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.inter_item_delay_ms)).await;
        }
    }

    let failed = results.iter().filter(|entry| !entry.is_success()).count();
    info!(
        "Batch finished: {}/{total} items succeeded in {}ms",
        total - failed,
        start.elapsed().as_millis()
    );

    Ok(results)
}
