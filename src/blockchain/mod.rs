//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Secret material (optional)
//!     → wallet.rs (KeyDerivation: secret → address, nothing retained)
//! Address
//!     → types.rs (format + checksum validation)
//!     → resolver.rs (endpoint from pool, query, normalise, report failure)
//!     → client.rs (alloy provider per endpoint)
//!     → units.rs (wei → "0.0000")
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod resolver;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::{AlloyBalanceQuery, BalanceQuery, QueryError};
pub use resolver::BalanceResolver;
pub use types::{parse_address, NetworkError, ResolveError, ValidationError};
pub use wallet::{KeyDerivation, Secp256k1Derivation};
