//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides for secrets/tunables)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → passed by reference into HttpServer / ForwardingEngine / AuditSink
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no ambient global settings object
//! - All fields have defaults so an empty config (or none at all) works
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::RetryConfig;
pub use schema::UpstreamConfig;
