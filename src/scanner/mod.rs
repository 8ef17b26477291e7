//! Scan runs.
//!
//! # Data Flow
//! ```text
//! submission (typed list or ingested file)
//!     → types.rs (ScanItem per entry, ScanStats)
//!     → run.rs (register run; supersede or refuse the previous one)
//!     → batch.rs (BatchScheduler: batches in order, items concurrent, retries)
//!     → BatchReport per batch → progress channel
//! ```

pub mod batch;
pub mod run;
pub mod types;

pub use batch::{BatchReport, BatchScheduler};
pub use run::{RunError, RunRegistry};
pub use types::{
    split_entries, InputKind, RecordSet, RecordStatus, ScanItem, ScanStats, WalletRecord,
};
