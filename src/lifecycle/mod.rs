//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → stop accepting → cancel active run → detach observers → exit
//!
//! Cancellation (cancel.rs):
//!     Cancel message / superseding submission / shutdown
//!     → CancelHandle::cancel
//!     → scheduler checks CancelSignal before each batch and attempt
//! ```

pub mod cancel;
pub mod shutdown;
pub mod signals;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use shutdown::Shutdown;
