//! Audit trail subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding engine decides the outcome of an exchange
//!     → sink.rs (fire-and-forget boundary, owns error swallowing)
//!     → store.rs (blocking SQLite insert on a spawn_blocking task)
//!     → request_logs table (append-only)
//! ```
//!
//! # Design Decisions
//! - One record per exchange, written exactly once, success or failure
//! - Persistence failures are logged and discarded; they never reach the
//!   exchange's caller
//! - No ordering guarantee across concurrent exchanges

pub mod sink;
pub mod store;

pub use sink::AuditSink;
pub use store::{AuditRecord, AuditStore};
