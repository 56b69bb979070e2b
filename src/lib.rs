//! Transparent Auditing Proxy Library

pub mod audit;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod proxy;

pub use audit::{AuditRecord, AuditSink, AuditStore};
pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ForwardingEngine;
