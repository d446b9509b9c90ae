// Time-bounded execution primitives used for every call to a slow or
// rate-limited dependency: LLM completions, PDF extraction.
//
// Leaves first: timeout -> retry -> dynamic_timeout -> batch.
// Nothing here holds state across calls; every timer lives inside one call.

pub mod batch;
pub mod dynamic_timeout;
pub mod retry;
pub mod timeout;

pub use batch::{execute_batch, BatchEntry, BatchOptions, TOTAL_TIMEOUT_BUFFER_MS};
pub use dynamic_timeout::{TimeoutCategory, TimeoutTable, TIMEOUT_CEILING_MS};
pub use retry::{retry_with_timeout_if, RetryOptions};
pub use timeout::{with_timeout, TimeoutError};
