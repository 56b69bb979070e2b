//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → /health answered locally, everything else handed to the
//!       forwarding engine
//!     → streamed response (or a fixed 502 on gateway failure)
//! ```

pub mod server;

pub use server::HttpServer;
