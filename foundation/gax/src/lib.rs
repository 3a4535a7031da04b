//! Shared asynchronous plumbing for the provider crates: bounded retry,
//! cancellation, convergence waiters and a fixed-size worker pool.

pub mod cancel;
pub mod pool;
pub mod retry;
pub mod wait;

pub use cancel::CancellationToken;

/// Returned when a caller-supplied cancellation token fires mid-operation.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled by caller")]
pub struct Cancelled;
