//! # Tower Turn
//!
//! `tower-turn` puts a [`turn_limit::TurnLimiter`] in front of any
//! [Tower](https://github.com/tower-rs/tower) service.
//!
//! Requests await their admission turn before reaching the inner
//! service. Several layers can share one limiter, each entering the
//! wait queue at its own priority, so a single admission window can be
//! split between interactive and background traffic:
//!
//! 1. **Priority**: [`TurnLimitLayer::with_priority`] decides which
//!    layer's requests win a freed slot first.
//! 2. **Timeouts**: [`TurnLimitLayer::with_timeout`] bounds the wait,
//!    failing with [`TurnError::Timeout`] instead of queueing forever.

mod error;
mod layer;
mod service;


pub use error::TurnError;
pub use layer::TurnLimitLayer;
pub use service::TurnLimitService;
