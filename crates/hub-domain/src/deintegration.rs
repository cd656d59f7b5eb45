//! Deintegration data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cleanup policy governing when/how resources are released.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "type", content = "at")]
pub enum CleanupPolicy {
    Immediate,
    Graceful,
    Scheduled(DateTime<Utc>),
    Manual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeintegrationStatus {
    InProgress,
    Completed,
    Failed,
    Scheduled,
    AwaitingConfirmation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
    Scheduled,
    AwaitingConfirmation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeintegrationStep {
    pub name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: StepStatus,
    #[serde(default)]
    pub checks: Vec<StepCheck>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCheck {
    pub name: String,
    pub passed: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeintegrationRecord {
    pub id: String,
    pub integration_id: String,
    pub policy: CleanupPolicy,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: DeintegrationStatus,
    pub steps: Vec<DeintegrationStep>,
    pub preserve_data: bool,
    pub force: bool,
    /// Type of the integration being torn down, recorded so
    /// `Reintegrate` can instantiate the right adapter later.
    pub adapter_type: String,
    /// Original `name`, carried along so `Reintegrate` doesn't have to
    /// invent one.
    pub integration_name: String,
}

/// The on-disk `<id>-state.json` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub integration_id: String,
    pub deintegration_id: String,
    pub timestamp: DateTime<Utc>,
    pub state: serde_json::Value,
    pub metadata: StateSnapshotMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshotMetadata {
    pub adapter_type: String,
    pub version: u32,
}
