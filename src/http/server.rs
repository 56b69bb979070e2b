//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health and catch-all proxy handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener, serve with graceful shutdown
//! - Map gateway failures to a fixed 502 response

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::audit::{AuditSink, AuditStore};
use crate::config::GatewayConfig;
use crate::proxy::{ForwardingEngine, GatewayError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ForwardingEngine>,
}

/// HTTP server for the auditing proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and audit store.
    pub fn new(config: GatewayConfig, store: Arc<AuditStore>) -> Result<Self, GatewayError> {
        let sink = AuditSink::new(store);
        let engine = Arc::new(ForwardingEngine::new(&config, sink)?);

        let state = AppState { engine };
        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health", any(health_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Liveness check. Answered locally, never forwarded.
async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Catch-all handler: every other path goes through the forwarding engine.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.engine.forward(request).await {
        Ok(response) => response,
        Err(e) => (StatusCode::BAD_GATEWAY, format!("Upstream error: {}", e)).into_response(),
    }
}
