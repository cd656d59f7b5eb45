//! Handlers for delete/reintegrate/confirm.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use hub_core::{DeintegrationManager, DeleteOptions};
use hub_domain::CleanupPolicy;

use crate::error_response::{ApiError, map_error};

#[derive(Debug, Deserialize)]
pub struct DeletePayload {
    #[serde(default = "default_policy")]
    pub policy: CleanupPolicy,
    #[serde(default, rename = "preserveData")]
    pub preserve_data: bool,
    #[serde(default)]
    pub force: bool,
}

fn default_policy() -> CleanupPolicy {
    CleanupPolicy::Immediate
}

#[derive(Debug, Serialize)]
pub struct DeintegrationResponse {
    #[serde(rename = "deintegrationId")]
    pub deintegration_id: String,
}

pub async fn delete(
    State(deintegration): State<Arc<DeintegrationManager>>,
    Path(id): Path<String>,
    Json(payload): Json<DeletePayload>,
) -> Result<Json<DeintegrationResponse>, ApiError> {
    let deintegration_id = deintegration
        .delete(
            &id,
            DeleteOptions {
                policy: payload.policy,
                preserve_data: payload.preserve_data,
                force: payload.force,
            },
        )
        .await
        .map_err(map_error)?;
    Ok(Json(DeintegrationResponse { deintegration_id }))
}

#[derive(Debug, Serialize)]
pub struct ReintegrateResponse {
    pub id: String,
}

pub async fn reintegrate(
    State(deintegration): State<Arc<DeintegrationManager>>,
    Path(deintegration_id): Path<String>,
) -> Result<Json<ReintegrateResponse>, ApiError> {
    let id = deintegration.reintegrate(&deintegration_id, None).await.map_err(map_error)?;
    Ok(Json(ReintegrateResponse { id }))
}

pub async fn confirm_manual(
    State(deintegration): State<Arc<DeintegrationManager>>,
    Path(deintegration_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    deintegration.confirm_manual(&deintegration_id).await.map_err(map_error)?;
    Ok(StatusCode::OK)
}
