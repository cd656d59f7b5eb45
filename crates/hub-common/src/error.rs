//! Error types for the Integration Hub.
//!
//! One enum carries every stable error kind named in the component design
//! (Registry, Port Allocator, Deintegration Manager, Event Bus, Webhook
//! Deliverer) so that callers — including the HTTP layer — can match on a
//! single type regardless of which component raised it.

use thiserror::Error;

/// Main error type for Integration Hub operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `type` field is not in the integration type catalog.
    #[error("invalid integration type: {0}")]
    InvalidType(String),

    /// A required config field for the type was absent.
    #[error("missing required field `{field}` for type `{ty}`")]
    MissingField { ty: String, field: String },

    /// Port allocator could not find a free port within range/attempts.
    #[error("no available port found: {0}")]
    PortExhausted(String),

    /// Initial health probe failed and was not bypassed.
    #[error("service unreachable: {0}")]
    ServiceUnreachable(String),

    /// Type-specific initialization failed.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// No record with the given id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Mutation attempted on a `removed` record.
    #[error("record is immutable (removed): {0}")]
    Immutable(String),

    /// Deintegration validation step found live connections/operations/dependents.
    #[error("deintegration blocked: {0}")]
    DeintegrationBlocked(String),

    /// Post-cleanup invariants were not satisfied.
    #[error("cleanup verification failed: {0}")]
    CleanupVerificationFailed(String),

    /// Reintegration target has no persisted record.
    #[error("deintegration record not found: {0}")]
    RecordNotFound(String),

    /// Snapshot JSON failed to parse.
    #[error("state snapshot corrupt: {0}")]
    StateCorrupt(String),

    /// Adapter type named in a deintegration record is no longer registered.
    #[error("adapter type unavailable: {0}")]
    TypeUnavailable(String),

    /// `Request`/`reply` deadline elapsed.
    #[error("request timed out waiting for reply")]
    RequestTimeout,

    /// Webhook POST returned non-2xx or a transport error.
    #[error("webhook delivery failed: {0}")]
    DeliveryFailed(String),

    /// JSON (de)serialization failure, wrapped from `serde_json`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem I/O failure (deintegration snapshots, directory setup).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded from the environment.
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything that doesn't fit a more specific kind above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable identifier a client can switch on: every operation
    /// translates its internal error into one of these before crossing
    /// the HTTP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidType(_) => "InvalidType",
            Error::MissingField { .. } => "MissingField",
            Error::PortExhausted(_) => "PortExhausted",
            Error::ServiceUnreachable(_) => "ServiceUnreachable",
            Error::RegistrationFailed(_) => "RegistrationFailed",
            Error::NotFound(_) => "NotFound",
            Error::Immutable(_) => "Immutable",
            Error::DeintegrationBlocked(_) => "DeintegrationBlocked",
            Error::CleanupVerificationFailed(_) => "CleanupVerificationFailed",
            Error::RecordNotFound(_) => "RecordNotFound",
            Error::StateCorrupt(_) => "StateCorrupt",
            Error::TypeUnavailable(_) => "TypeUnavailable",
            Error::RequestTimeout => "RequestTimeout",
            Error::DeliveryFailed(_) => "DeliveryFailed",
            Error::Json(_) => "InternalError",
            Error::Io(_) => "InternalError",
            Error::Config(_) => "ConfigError",
            Error::Internal(_) => "InternalError",
        }
    }
}

/// Result type alias for Integration Hub operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_for_not_found() {
        let err = Error::NotFound("int_123".to_string());
        assert_eq!(err.kind(), "NotFound");
        assert_eq!(err.to_string(), "not found: int_123");
    }

    #[test]
    fn kind_is_stable_for_missing_field() {
        let err = Error::MissingField {
            ty: "database".to_string(),
            field: "connectionString".to_string(),
        };
        assert_eq!(err.kind(), "MissingField");
    }
}
