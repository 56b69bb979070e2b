//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Open audit store → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C received → Broadcast signal → Stop accepting → Drain → Exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
