//! Stable error-body translation at the HTTP boundary: every operation
//! translates internal error kinds to stable identifiers.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use hub_common::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn map_error(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidType(_) => StatusCode::BAD_REQUEST,
        Error::MissingField { .. } => StatusCode::BAD_REQUEST,
        Error::PortExhausted(_) => StatusCode::CONFLICT,
        Error::ServiceUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::RegistrationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Immutable(_) => StatusCode::CONFLICT,
        Error::DeintegrationBlocked(_) => StatusCode::CONFLICT,
        Error::CleanupVerificationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::RecordNotFound(_) => StatusCode::NOT_FOUND,
        Error::StateCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::TypeUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
        Error::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        Error::Json(_) | Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = err.to_string();
    (status, Json(ErrorResponse { error: err.kind(), message }))
}
