//! Startup glue and HTTP API for the Ploston Enterprise server.

mod startup;

pub use startup::{bootstrap, bootstrap_with, failure_message, Bootstrap, EXPIRY_WARNING_DAYS};

use std::sync::Arc;
use axum::{extract::State, response::Json, routing::get, Router};
use ploston_entitlements::{CapabilitiesProvider, CapabilitiesSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn capabilities_handler(
    State(provider): State<Arc<dyn CapabilitiesProvider>>,
) -> Json<CapabilitiesSnapshot> {
    Json(provider.get_capabilities())
}

/// Build the HTTP API router serving capabilities from `provider`.
pub fn build_router(provider: Arc<dyn CapabilitiesProvider>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/capabilities", get(capabilities_handler))
        .with_state(provider)
}
