//! Provider endpoint selection.
//!
//! # Data Flow
//! ```text
//! BalanceResolver needs a provider
//!     → pool.rs (round-robin over non-quarantined endpoints)
//!     → endpoint.rs (URL handed to the balance query)
//!     → on failure: pool.mark_failed(endpoint)
//! ```
//!
//! # Design Decisions
//! - One pool instance is injected into every resolver; no global state
//! - Quarantine is set membership, never removal
//! - Total quarantine triggers a full reset instead of an error

pub mod endpoint;
pub mod pool;

pub use endpoint::{Endpoint, EndpointStatus};
pub use pool::{EndpointPool, PoolError};
