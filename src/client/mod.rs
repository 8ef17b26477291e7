//! Observer-side state.
//!
//! # Data Flow
//! ```text
//! PushMessage (upload / wallet-update)
//!     → state.rs (ClientState: merge by address, summary, ranking)
//!     → cache.rs (SnapshotStore: persist with timestamp, TTL on load)
//! ```

pub mod cache;
pub mod state;

pub use cache::{CacheError, CacheSnapshot, SnapshotStore, SNAPSHOT_FILE, SNAPSHOT_TTL};
pub use state::{ClientState, Summary};
