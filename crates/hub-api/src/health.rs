//! Liveness/readiness surface, modeled on the sibling services' health
//! endpoints. The hub has no database to probe; readiness just reports
//! that the registry is reachable.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};
use std::sync::Arc;

use hub_core::Registry;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "hub-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn readiness_check(State(registry): State<Arc<Registry>>) -> Json<Value> {
    let integrations = registry.list(Default::default()).await.len();
    Json(json!({
        "ready": true,
        "service": "hub-api",
        "integrations": integrations,
    }))
}

pub async fn liveness_check() -> Json<Value> {
    Json(json!({
        "alive": true,
        "service": "hub-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
