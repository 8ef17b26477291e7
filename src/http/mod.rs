//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, limits)
//!     → handlers.rs (/api/scan, /api/upload, /api/endpoints, /api/status)
//!     → websocket.rs (/ws observers on the progress channel)
//!     → response.rs (errors → {"error": ...})
//! ```

pub mod handlers;
pub mod response;
pub mod server;
pub mod websocket;

pub use response::ApiError;
pub use server::{AppState, HttpServer};
