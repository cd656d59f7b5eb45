//! The integration record — the central entity of the hub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::delivery_log::DeliveryLogEntry;

/// Closed catalog of integration types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationType {
    WebUi,
    DevelopmentTool,
    ApiService,
    Database,
    MessageQueue,
    Openapi,
    Webhook,
    Plugin,
}

impl IntegrationType {
    /// All catalog entries, for iteration (e.g. validating a type string).
    pub const ALL: [IntegrationType; 8] = [
        IntegrationType::WebUi,
        IntegrationType::DevelopmentTool,
        IntegrationType::ApiService,
        IntegrationType::Database,
        IntegrationType::MessageQueue,
        IntegrationType::Openapi,
        IntegrationType::Webhook,
        IntegrationType::Plugin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::WebUi => "web-ui",
            IntegrationType::DevelopmentTool => "development-tool",
            IntegrationType::ApiService => "api-service",
            IntegrationType::Database => "database",
            IntegrationType::MessageQueue => "message-queue",
            IntegrationType::Openapi => "openapi",
            IntegrationType::Webhook => "webhook",
            IntegrationType::Plugin => "plugin",
        }
    }

    pub fn parse(raw: &str) -> Option<IntegrationType> {
        IntegrationType::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Initializing,
    Active,
    Unhealthy,
    Disabled,
    Failed,
    Removed,
}

/// Health-check configuration carried on a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub url: Option<String>,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub enabled: bool,
}

/// Running counters tracked per integration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationMetrics {
    pub requests: u64,
    pub errors: u64,
    pub health_total: u64,
    pub health_ok: u64,
    pub health_fail: u64,
    pub last_health_check_at: Option<DateTime<Utc>>,
    pub last_health_error: Option<String>,
    pub avg_response_time_ms: f64,
}

/// The integration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub integration_type: IntegrationType,
    pub config: serde_json::Value,
    pub status: IntegrationStatus,
    pub allocated_port: Option<u16>,
    pub original_port: Option<u16>,
    pub health_check: HealthCheckConfig,
    pub metrics: IntegrationMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub registered_at: Option<DateTime<Utc>>,

    /// Webhook-type integrations only: patterns subscribed on the event bus.
    #[serde(default)]
    pub subscribed_topics: HashSet<String>,

    /// Webhook-type integrations only: bounded delivery history.
    #[serde(default)]
    pub delivery_log: Vec<DeliveryLogEntry>,

    /// Monotonic generation counter, bumped on every status transition.
    /// Used by the health prober to discard stale in-flight probe results
    /// for a record that has since been disabled/removed.
    #[serde(default)]
    pub generation: u64,
}

impl IntegrationRecord {
    pub fn is_live(&self) -> bool {
        !matches!(self.status, IntegrationStatus::Removed | IntegrationStatus::Failed)
    }
}
