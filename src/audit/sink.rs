//! Fire-and-forget boundary in front of the audit store.

use std::sync::Arc;

use crate::audit::store::{AuditRecord, AuditStore};

/// Best-effort writer for audit records.
///
/// `record` returns immediately; the insert happens on a blocking task and
/// any persistence error is logged for operator visibility and discarded.
/// The forwarding engine's correctness never depends on a write succeeding.
#[derive(Clone)]
pub struct AuditSink {
    store: Arc<AuditStore>,
}

impl AuditSink {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self { store }
    }

    /// Persist one record without blocking or failing the exchange.
    pub fn record(&self, record: AuditRecord) {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.insert(&record) {
                tracing::error!(error = %e, "Failed to write audit record");
            }
        });
    }
}
