//! Shared application state for the HTTP surface.

use std::sync::Arc;

use hub_core::{DeintegrationManager, Registry};

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub deintegration: Arc<DeintegrationManager>,
    pub config: Config,
}

impl axum::extract::FromRef<AppState> for Arc<Registry> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.registry)
    }
}

impl axum::extract::FromRef<AppState> for Arc<DeintegrationManager> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.deintegration)
    }
}

impl axum::extract::FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
