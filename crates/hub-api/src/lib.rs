//! HTTP surface for the Integration Hub. A thin `axum`
//! translation layer over `hub-core`'s `Registry` and
//! `DeintegrationManager` — no authentication, authorization, or rate
//! limiting, per the workspace's Non-goals.

pub mod config;
pub mod error_response;
pub mod handlers;
pub mod health;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use hub_core::{DeintegrationManager, Registry};

pub use config::Config;
pub use state::AppState;

/// Builds the full router: health surface at the root, integration/
/// deintegration operations under `/api/v1`.
pub fn build_router(registry: Arc<Registry>, deintegration: Arc<DeintegrationManager>, config: Config) -> Router {
    let state = AppState { registry, deintegration, config };

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/live", get(health::liveness_check));

    let api_routes = Router::new()
        .route("/integrations", post(handlers::integrations::register).get(handlers::integrations::list))
        .route(
            "/integrations/{id}",
            get(handlers::integrations::get)
                .patch(handlers::integrations::update_config)
                .delete(handlers::deintegrations::delete),
        )
        .route("/integrations/{id}/enable", post(handlers::integrations::enable))
        .route("/integrations/{id}/disable", post(handlers::integrations::disable))
        .route("/integrations/{id}/test", post(handlers::integrations::test))
        .route("/integrations/{id}/actions/{action}", post(handlers::integrations::action))
        .route("/integrations/{id}/metrics", get(handlers::integrations::metrics))
        .route("/deintegrations/{id}/reintegrate", post(handlers::deintegrations::reintegrate))
        .route("/deintegrations/{id}/confirm", post(handlers::deintegrations::confirm_manual));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
}
