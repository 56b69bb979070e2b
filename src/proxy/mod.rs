//! Request forwarding subsystem — the core of the proxy.
//!
//! # Data Flow
//! ```text
//! Inbound request (any method, any path)
//!     → engine.rs (collect body, build outbound request)
//!     → prompt.rs (best-effort system prompt lookup for the audit trail)
//!     → retry.rs (bounded retry over transport failures)
//!     → upstream response streamed back chunk-by-chunk
//!     → audit sink notified exactly once (success or failure)
//! ```
//!
//! # Design Decisions
//! - Body bytes sent upstream are byte-identical to those received inbound
//! - Only connect/timeout failures are retried; any received HTTP response
//!   (including 5xx) is final and streamed through as-is
//! - Retry exhaustion surfaces as a gateway failure, never as a fabricated
//!   upstream status

pub mod engine;
pub mod prompt;
pub mod retry;

pub use engine::{ForwardingEngine, GatewayError};
pub use prompt::extract_system_prompt;
