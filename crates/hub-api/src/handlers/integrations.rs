//! Handlers for `/api/v1/integrations*`.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hub_common::Error;
use hub_core::{ListFilter, RegisterOptions, RegisterRequest, Registry};
use hub_domain::{IntegrationRecord, IntegrationStatus, IntegrationType};

use crate::error_response::{ApiError, map_error};

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub options: RegisterOptionsPayload,
}

#[derive(Debug, Deserialize, Default)]
pub struct RegisterOptionsPayload {
    #[serde(default, rename = "skipHealthCheck")]
    pub skip_health_check: bool,
    #[serde(default, rename = "autoDetectPort")]
    pub auto_detect_port: bool,
    #[serde(default, rename = "bypassHealthCheck")]
    pub bypass_health_check: bool,
}

impl From<RegisterOptionsPayload> for RegisterOptions {
    fn from(p: RegisterOptionsPayload) -> Self {
        Self {
            skip_health_check: p.skip_health_check,
            auto_detect_port: p.auto_detect_port,
            bypass_health_check: p.bypass_health_check,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
}

pub async fn register(
    State(registry): State<Arc<Registry>>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let integration_type =
        IntegrationType::parse(&payload.integration_type).ok_or_else(|| Error::InvalidType(payload.integration_type.clone()))?;

    let req = RegisterRequest {
        name: payload.name,
        integration_type,
        config: payload.config,
        options: payload.options.into(),
        handle: None,
    };

    let id = registry.register(req).await.map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub integration_type: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
}

pub async fn list(State(registry): State<Arc<Registry>>, Query(query): Query<ListQuery>) -> Result<Json<Vec<IntegrationRecord>>, ApiError> {
    let integration_type = query
        .integration_type
        .as_deref()
        .map(|t| IntegrationType::parse(t).ok_or_else(|| Error::InvalidType(t.to_string())))
        .transpose()
        .map_err(map_error)?;

    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .map_err(map_error)?;

    let records = registry
        .list(ListFilter {
            integration_type,
            status,
            tag: query.tag,
        })
        .await;
    Ok(Json(records))
}

fn parse_status(raw: &str) -> Result<IntegrationStatus, Error> {
    match raw {
        "initializing" => Ok(IntegrationStatus::Initializing),
        "active" => Ok(IntegrationStatus::Active),
        "unhealthy" => Ok(IntegrationStatus::Unhealthy),
        "disabled" => Ok(IntegrationStatus::Disabled),
        "failed" => Ok(IntegrationStatus::Failed),
        "removed" => Ok(IntegrationStatus::Removed),
        other => Err(Error::InvalidType(other.to_string())),
    }
}

pub async fn get(State(registry): State<Arc<Registry>>, Path(id): Path<String>) -> Result<Json<IntegrationRecord>, ApiError> {
    let record = registry.get(&id).await.map_err(map_error)?;
    Ok(Json(record))
}

pub async fn update_config(
    State(registry): State<Arc<Registry>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<IntegrationRecord>, ApiError> {
    let record = registry.update_config(&id, patch).await.map_err(map_error)?;
    Ok(Json(record))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: IntegrationStatus,
}

pub async fn enable(State(registry): State<Arc<Registry>>, Path(id): Path<String>) -> Result<Json<StatusResponse>, ApiError> {
    let status = registry.enable(&id).await.map_err(map_error)?;
    Ok(Json(StatusResponse { status }))
}

pub async fn disable(State(registry): State<Arc<Registry>>, Path(id): Path<String>) -> Result<Json<StatusResponse>, ApiError> {
    let status = registry.disable(&id).await.map_err(map_error)?;
    Ok(Json(StatusResponse { status }))
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub success: bool,
    pub message: String,
    pub details: Value,
}

/// Runs a one-off health probe against the record's configured URL,
/// independent of the scheduled prober.
pub async fn test(State(registry): State<Arc<Registry>>, Path(id): Path<String>) -> Result<Json<TestResponse>, ApiError> {
    let record = registry.get(&id).await.map_err(map_error)?;
    let catalog_entry = hub_core::catalog::lookup(record.integration_type);

    let Some(url) = hub_core::health_prober::probe_url(&record.config, &catalog_entry) else {
        return Ok(Json(TestResponse {
            success: true,
            message: "no health check configured for this type".to_string(),
            details: serde_json::json!({ "type": record.integration_type.as_str() }),
        }));
    };

    match hub_core::health_prober::probe_once(&url, Duration::from_millis(record.health_check.timeout_ms)).await {
        Ok(()) => Ok(Json(TestResponse {
            success: true,
            message: "probe succeeded".to_string(),
            details: serde_json::json!({ "url": url }),
        })),
        Err(reason) => Ok(Json(TestResponse {
            success: false,
            message: reason.clone(),
            details: serde_json::json!({ "url": url, "error": reason }),
        })),
    }
}

pub async fn action(
    State(registry): State<Arc<Registry>>,
    Path((id, action)): Path<(String, String)>,
    Json(params): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let handle = registry.handle_for(&id).await.map_err(map_error)?;
    let result = handle.action(&action, params).await.map_err(map_error)?;
    Ok(Json(result))
}

pub async fn metrics(State(registry): State<Arc<Registry>>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let record = registry.get(&id).await.map_err(map_error)?;
    Ok(Json(serde_json::to_value(record.metrics).unwrap_or(Value::Null)))
}
