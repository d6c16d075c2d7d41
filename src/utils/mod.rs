//! Utility functions and helpers for the gemguard client.
//!
//! This module provides cross-cutting concerns like structured logging,
//! secret redaction, deadline supervision and retry with backoff.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization with redaction helpers.
//! - `retry`: Bounded retry with exponential backoff.
//! - `timeout`: Races a single attempt against a deadline.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryPolicy};
pub use timeout::with_timeout;
