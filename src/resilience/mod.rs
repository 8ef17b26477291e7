//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Item resolution:
//!     → retries.rs (attempt, classify error, wait, check cancellation)
//!     → backoff.rs (base * 2^n, capped, optional jitter)
//! ```
//!
//! # Design Decisions
//! - Validation failures are never retried
//! - Backoff is deterministic unless jitter is configured
//! - Provider timeouts are enforced by the resolver, not here

pub mod backoff;
pub mod retries;

pub use retries::{retry_with_backoff, RetryOutcome, RetryPolicy};
