//! Progress reporting subsystem.
//!
//! # Data Flow
//! ```text
//! StreamIngestor / BatchScheduler
//!     → events.rs (ProgressEvent: phase, percent, counters, chunk)
//!     → messages.rs (PushMessage: "upload" | "wallet-update" | "pong")
//!     → channel.rs (encode once, fan out to every attached peer queue)
//!     → http/websocket.rs (one task per peer drains its queue)
//! ```

pub mod channel;
pub mod events;
pub mod messages;

pub use channel::ProgressChannel;
pub use events::{Chunk, Phase, ProgressEvent};
pub use messages::{ClientMessage, PushMessage};
