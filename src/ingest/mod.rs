//! File ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! multipart field "file"
//!     → upload.rs (Spooler: stream to temp file, size ceiling, empty check)
//!     → stream.rs (StreamIngestor: count pass, processing pass, events)
//!     → Vec<ScanItem> + ScanStats handed to the scheduler
//! ```
//!
//! Any [`PipelineError`] aborts the submission; the temp file goes with the
//! owning value on every path.

pub mod error;
pub mod stream;
pub mod upload;

pub use error::PipelineError;
pub use stream::{IngestRun, StreamIngestor};
pub use upload::{SpooledFile, Spooler};
