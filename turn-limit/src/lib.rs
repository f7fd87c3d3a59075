//! # turn-limit
//!
//! `turn-limit` is an in-process admission controller: callers ask for
//! permission to proceed (a "turn"), and the limiter admits at most N
//! callers per rolling window of T seconds.
//!
//! ## Core Philosophy
//!
//! Rather than rejecting callers when the window is full, the limiter
//! parks them in a priority wait queue. Every grant occupies its slot
//! for exactly one window; when the slot frees, the highest-priority
//! waiter (FIFO within a priority) is admitted in its place, so a busy
//! limiter drains in strict priority order without busy polling.
//!
//! ## Key Concepts
//!
//! * **Priority**: higher values are served first whenever a slot
//!   frees. Starvation of low priorities under sustained high-priority
//!   load is accepted behavior, not a bug.
//! * **Deadline**: an optional per-wait timeout; a still-queued caller
//!   fails with [`WaitTimeout`] once it elapses, and exactly one of
//!   grant or timeout ever resolves a given wait.
//! * **Single writer**: all queue and window state sits behind one
//!   mutex, so the limiter can be shared freely across tasks.
//!
//! ## Example
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//! use turn_limit::TurnLimiter;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let limiter = TurnLimiter::new(NonZeroUsize::new(2).unwrap(), Duration::from_secs(60));
//!
//!     // Capacity is available, so this returns at once.
//!     limiter.await_turn().await.unwrap();
//!     assert_eq!(limiter.used_slots(), 1);
//! }
//! ```

mod limiter;
mod queue;
mod window;

pub use limiter::TurnLimiter;

/// The only failure the limiter produces: a queued caller's deadline
/// elapsed before an admission slot freed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timed out waiting for an admission slot")]
pub struct WaitTimeout;
