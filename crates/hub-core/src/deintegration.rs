//! Deintegration Manager: the six-step teardown pipeline,
//! state snapshot/restore, and re-integration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use hub_common::{Error, Result};
use hub_domain::{
    CleanupPolicy, DeintegrationRecord, DeintegrationStatus, DeintegrationStep, IntegrationType, StateSnapshot,
    StateSnapshotMetadata, StepCheck, StepStatus,
};

use crate::event_bus::{EventBus, PublishOptions};
use crate::handle::IntegrationHandle;
use crate::notifier::{NoDependents, Notifier};
use crate::registry::{RegisterOptions, RegisterRequest, Registry};

/// Poll period/ceiling for the `graceful` policy's drain wait.
const GRACEFUL_POLL_INTERVAL: Duration = Duration::from_secs(1);
const GRACEFUL_POLL_MAX_TICKS: u32 = 60;

/// Grace period advertised to dependents in the `integration:removing`
/// notice. The pipeline itself does not block on this — see DESIGN.md
/// for the rationale.
const DEPENDENT_GRACE_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub policy: CleanupPolicy,
    pub preserve_data: bool,
    pub force: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            policy: CleanupPolicy::Immediate,
            preserve_data: false,
            force: false,
        }
    }
}

struct PendingManual {
    integration_id: String,
    handle: Arc<dyn IntegrationHandle>,
}

/// Process-wide deintegration manager singleton.
pub struct DeintegrationManager {
    registry: Arc<Registry>,
    event_bus: Arc<EventBus>,
    notifier: Arc<dyn Notifier>,
    directory: PathBuf,
    records: RwLock<HashMap<String, DeintegrationRecord>>,
    pending_manual: RwLock<HashMap<String, PendingManual>>,
}

impl DeintegrationManager {
    pub fn new(registry: Arc<Registry>, event_bus: Arc<EventBus>, directory: PathBuf) -> Arc<Self> {
        Self::with_notifier(registry, event_bus, directory, Arc::new(NoDependents))
    }

    pub fn with_notifier(
        registry: Arc<Registry>,
        event_bus: Arc<EventBus>,
        directory: PathBuf,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            event_bus,
            notifier,
            directory,
            records: RwLock::new(HashMap::new()),
            pending_manual: RwLock::new(HashMap::new()),
        })
    }

    /// Creates the persisted-state directory if it doesn't already exist.
    /// Call once at process start.
    pub async fn ensure_directory(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<DeintegrationRecord> {
        self.records.read().await.get(id).cloned().ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    /// Drives the six-step teardown pipeline for `integration_id`.
    /// Returns the deintegration id immediately for `scheduled` (future)
    /// and `manual` policies, whose remaining steps complete later.
    pub async fn delete(self: &Arc<Self>, integration_id: &str, options: DeleteOptions) -> Result<String> {
        let target = self.registry.get(integration_id).await?;
        let handle = self.registry.handle_for(integration_id).await?;

        let deintegration_id = Uuid::new_v4().to_string();
        let mut record = DeintegrationRecord {
            id: deintegration_id.clone(),
            integration_id: integration_id.to_string(),
            policy: options.policy.clone(),
            started_at: Utc::now(),
            ended_at: None,
            status: DeintegrationStatus::InProgress,
            steps: Vec::new(),
            preserve_data: options.preserve_data,
            force: options.force,
            adapter_type: target.integration_type.as_str().to_string(),
            integration_name: target.name.clone(),
        };
        self.records.write().await.insert(deintegration_id.clone(), record.clone());
        self.event_bus
            .publish(
                "deintegration.started",
                json!({ "deintegrationId": deintegration_id, "integrationId": integration_id }),
                PublishOptions::default(),
            )
            .await?;

        // 1. Validate.
        let validate_step = self.run_validate(integration_id, &options, &handle).await;
        let blocked = validate_step.status == StepStatus::Failed;
        record.steps.push(validate_step);
        if blocked {
            record.status = DeintegrationStatus::Failed;
            record.ended_at = Some(Utc::now());
            let reason = record.steps.last().and_then(|s| s.error.clone()).unwrap_or_default();
            self.persist_and_store(record).await?;
            return Err(Error::DeintegrationBlocked(reason));
        }

        // 2. Notify dependents.
        record.steps.push(self.run_notify(integration_id).await);

        // 3. Save state (iff preserveData) — must land before any step >=4
        // touches the integration's resources.
        if options.preserve_data {
            match self.run_save_state(&deintegration_id, &record).await {
                Ok(step) => record.steps.push(step),
                Err(e) => {
                    record.status = DeintegrationStatus::Failed;
                    record.ended_at = Some(Utc::now());
                    self.persist_and_store(record).await?;
                    return Err(e);
                }
            }
        }

        // 4-6. Cleanup dispatch.
        match options.policy.clone() {
            CleanupPolicy::Immediate => {
                self.run_cleanup_and_finish(record, integration_id, handle, false).await?;
            }
            CleanupPolicy::Graceful => {
                self.run_cleanup_and_finish(record, integration_id, handle, true).await?;
            }
            CleanupPolicy::Scheduled(at_time) => {
                if at_time <= Utc::now() {
                    self.run_cleanup_and_finish(record, integration_id, handle, true).await?;
                } else {
                    record.steps.push(DeintegrationStep {
                        name: "cleanup".to_string(),
                        started_at: None,
                        ended_at: None,
                        status: StepStatus::Scheduled,
                        checks: Vec::new(),
                        error: None,
                    });
                    record.status = DeintegrationStatus::Scheduled;
                    self.records.write().await.insert(deintegration_id.clone(), record.clone());

                    let this = Arc::clone(self);
                    let integration_id = integration_id.to_string();
                    let wait = (at_time - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    tokio::spawn(async move {
                        tokio::time::sleep(wait).await;
                        let Ok(record) = this.get(&deintegration_id).await else { return };
                        if let Err(e) = this.run_cleanup_and_finish(record, &integration_id, handle, true).await {
                            warn!(%deintegration_id, error = %e, "scheduled deintegration failed");
                        }
                    });
                }
            }
            CleanupPolicy::Manual => {
                record.steps.push(DeintegrationStep {
                    name: "cleanup".to_string(),
                    started_at: None,
                    ended_at: None,
                    status: StepStatus::AwaitingConfirmation,
                    checks: Vec::new(),
                    error: None,
                });
                record.status = DeintegrationStatus::AwaitingConfirmation;
                self.pending_manual
                    .write()
                    .await
                    .insert(deintegration_id.clone(), PendingManual { integration_id: integration_id.to_string(), handle });
                self.records.write().await.insert(deintegration_id.clone(), record.clone());
                self.event_bus
                    .publish(
                        "deintegration.manual_required",
                        json!({ "deintegrationId": deintegration_id, "integrationId": integration_id }),
                        PublishOptions::default(),
                    )
                    .await?;
            }
        }

        Ok(deintegration_id)
    }

    /// Resumes a `manual` policy deintegration from step 4, as `graceful`.
    pub async fn confirm_manual(self: &Arc<Self>, deintegration_id: &str) -> Result<()> {
        let pending = self
            .pending_manual
            .write()
            .await
            .remove(deintegration_id)
            .ok_or_else(|| Error::RecordNotFound(deintegration_id.to_string()))?;
        let record = self.get(deintegration_id).await?;
        self.run_cleanup_and_finish(record, &pending.integration_id, pending.handle, true).await
    }

    async fn run_validate(&self, integration_id: &str, options: &DeleteOptions, _handle: &Arc<dyn IntegrationHandle>) -> DeintegrationStep {
        let started = Utc::now();
        if options.force {
            return DeintegrationStep {
                name: "validate".to_string(),
                started_at: Some(started),
                ended_at: Some(Utc::now()),
                status: StepStatus::Skipped,
                checks: Vec::new(),
                error: None,
            };
        }

        let active = self.registry.active_connections(integration_id).await.unwrap_or(0);
        let pending = self.registry.pending_operations(integration_id).await.unwrap_or(0);
        let dependents = self.registry.dependents_of(integration_id).await;

        let checks = vec![
            StepCheck { name: "active_connections".to_string(), passed: active == 0, detail: Some(active.to_string()) },
            StepCheck { name: "pending_operations".to_string(), passed: pending == 0, detail: Some(pending.to_string()) },
            StepCheck {
                name: "dependents".to_string(),
                passed: dependents.is_empty(),
                detail: Some(dependents.len().to_string()),
            },
        ];
        let passed = checks.iter().all(|c| c.passed);

        DeintegrationStep {
            name: "validate".to_string(),
            started_at: Some(started),
            ended_at: Some(Utc::now()),
            status: if passed { StepStatus::Completed } else { StepStatus::Failed },
            checks,
            error: if passed {
                None
            } else {
                Some(format!(
                    "blocked: active_connections={active} pending_operations={pending} dependents={}",
                    dependents.len()
                ))
            },
        }
    }

    /// Individual notification failures are recorded per-dependent but
    /// never abort the pipeline.
    async fn run_notify(&self, integration_id: &str) -> DeintegrationStep {
        let started = Utc::now();
        let dependents = self.registry.dependents_of(integration_id).await;
        let notice = json!({ "integrationId": integration_id, "gracePeriodMs": DEPENDENT_GRACE_MS });

        let mut checks = Vec::with_capacity(dependents.len());
        for dependent in &dependents {
            match self.notifier.notify(dependent, &notice).await {
                Ok(()) => checks.push(StepCheck { name: dependent.clone(), passed: true, detail: None }),
                Err(e) => checks.push(StepCheck { name: dependent.clone(), passed: false, detail: Some(e) }),
            }
        }

        DeintegrationStep {
            name: "notify_dependents".to_string(),
            started_at: Some(started),
            ended_at: Some(Utc::now()),
            status: StepStatus::Completed,
            checks,
            error: None,
        }
    }

    async fn run_save_state(&self, deintegration_id: &str, record: &DeintegrationRecord) -> Result<DeintegrationStep> {
        let started = Utc::now();
        let handle = self.registry.handle_for(&record.integration_id).await?;
        let state = handle.save_state().await?.unwrap_or(Value::Null);

        let snapshot = StateSnapshot {
            integration_id: record.integration_id.clone(),
            deintegration_id: deintegration_id.to_string(),
            timestamp: Utc::now(),
            state,
            metadata: StateSnapshotMetadata { adapter_type: record.adapter_type.clone(), version: 1 },
        };

        let path = self.directory.join(format!("{deintegration_id}-state.json"));
        let body = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&path, &body).await?;

        Ok(DeintegrationStep {
            name: "save_state".to_string(),
            started_at: Some(started),
            ended_at: Some(Utc::now()),
            status: StepStatus::Completed,
            checks: vec![StepCheck { name: "state_file_bytes".to_string(), passed: true, detail: Some(body.len().to_string()) }],
            error: None,
        })
    }

    /// Steps 4-6: cleanup dispatch, verify, persist. Shared by the
    /// `immediate`/`graceful` inline path, the fired `scheduled` timer,
    /// and `confirm_manual`.
    async fn run_cleanup_and_finish(
        self: &Arc<Self>,
        mut record: DeintegrationRecord,
        integration_id: &str,
        handle: Arc<dyn IntegrationHandle>,
        graceful: bool,
    ) -> Result<()> {
        record.status = DeintegrationStatus::InProgress;

        let cleanup_step = self.run_cleanup(&handle, graceful).await;
        let cleanup_failed = cleanup_step.status == StepStatus::Failed;
        record.steps.push(cleanup_step);

        // Ports are released on any terminal outcome, success or failure.
        let _ = self.registry.finalize_removal(integration_id).await;

        if cleanup_failed {
            record.status = DeintegrationStatus::Failed;
            record.ended_at = Some(Utc::now());
            let reason = record.steps.last().and_then(|s| s.error.clone()).unwrap_or_default();
            self.persist_and_store(record).await?;
            return Err(Error::CleanupVerificationFailed(reason));
        }

        let verify_step = self.run_verify(integration_id, &handle).await;
        let verify_failed = verify_step.status == StepStatus::Failed;
        record.steps.push(verify_step);

        if verify_failed {
            record.status = DeintegrationStatus::Failed;
            record.ended_at = Some(Utc::now());
            let reason = record.steps.last().and_then(|s| s.error.clone()).unwrap_or_default();
            self.persist_and_store(record).await?;
            return Err(Error::CleanupVerificationFailed(reason));
        }

        record.status = DeintegrationStatus::Completed;
        record.ended_at = Some(Utc::now());
        self.persist_and_store(record.clone()).await?;

        info!(%integration_id, deintegration_id = %record.id, "deintegration completed");
        self.event_bus
            .publish(
                "deintegration.completed",
                json!({ "deintegrationId": record.id, "integrationId": integration_id }),
                PublishOptions::default(),
            )
            .await?;

        Ok(())
    }

    async fn run_cleanup(&self, handle: &Arc<dyn IntegrationHandle>, graceful: bool) -> DeintegrationStep {
        let started = Utc::now();

        if graceful {
            if let Err(e) = handle.stop_accepting_operations().await {
                return DeintegrationStep {
                    name: "cleanup".to_string(),
                    started_at: Some(started),
                    ended_at: Some(Utc::now()),
                    status: StepStatus::Failed,
                    checks: Vec::new(),
                    error: Some(e.to_string()),
                };
            }

            let mut ticks = 0;
            while handle.pending_operations() > 0 && ticks < GRACEFUL_POLL_MAX_TICKS {
                tokio::time::sleep(GRACEFUL_POLL_INTERVAL).await;
                ticks += 1;
            }
        }

        match handle.cleanup().await {
            Ok(()) => DeintegrationStep {
                name: "cleanup".to_string(),
                started_at: Some(started),
                ended_at: Some(Utc::now()),
                status: StepStatus::Completed,
                checks: Vec::new(),
                error: None,
            },
            Err(e) => DeintegrationStep {
                name: "cleanup".to_string(),
                started_at: Some(started),
                ended_at: Some(Utc::now()),
                status: StepStatus::Failed,
                checks: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    async fn run_verify(&self, integration_id: &str, handle: &Arc<dyn IntegrationHandle>) -> DeintegrationStep {
        let started = Utc::now();
        let removed = self.registry.get(integration_id).await.is_err();
        let active = handle.active_connections();

        let checks = vec![
            StepCheck { name: "removed_from_registry".to_string(), passed: removed, detail: None },
            StepCheck { name: "active_connections".to_string(), passed: active == 0, detail: Some(active.to_string()) },
        ];
        let passed = checks.iter().all(|c| c.passed);

        DeintegrationStep {
            name: "verify_cleanup".to_string(),
            started_at: Some(started),
            ended_at: Some(Utc::now()),
            status: if passed { StepStatus::Completed } else { StepStatus::Failed },
            checks,
            error: if passed { None } else { Some("post-cleanup invariants not satisfied".to_string()) },
        }
    }

    async fn persist_and_store(&self, record: DeintegrationRecord) -> Result<()> {
        let path = self.directory.join(format!("{}-record.json", record.id));
        let body = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(&path, &body).await?;
        self.records.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    /// Loads both persisted artifacts for `deintegration_id`, instantiates
    /// an integration of the recorded adapter type, and registers it under
    /// its original id.
    ///
    /// `handle` is the caller-supplied collaborator for the recreated
    /// integration (the manager has no factory for concrete adapters —
    /// the closed type catalog covers construction of built-in types,
    /// not arbitrary handle reconstruction); its `restore_state` is called
    /// with the saved state blob when present.
    pub async fn reintegrate(self: &Arc<Self>, deintegration_id: &str, handle: Option<Arc<dyn IntegrationHandle>>) -> Result<String> {
        let record_path = self.directory.join(format!("{deintegration_id}-record.json"));
        let raw_record = tokio::fs::read(&record_path)
            .await
            .map_err(|_| Error::RecordNotFound(deintegration_id.to_string()))?;
        let record: DeintegrationRecord =
            serde_json::from_slice(&raw_record).map_err(|e| Error::StateCorrupt(e.to_string()))?;

        let integration_type =
            IntegrationType::parse(&record.adapter_type).ok_or_else(|| Error::TypeUnavailable(record.adapter_type.clone()))?;

        let state_path = self.directory.join(format!("{deintegration_id}-state.json"));
        let config = match tokio::fs::read(&state_path).await {
            Ok(raw_state) => {
                let snapshot: StateSnapshot =
                    serde_json::from_slice(&raw_state).map_err(|e| Error::StateCorrupt(e.to_string()))?;
                if let Some(handle) = &handle {
                    handle.restore_state(&snapshot.state).await?;
                }
                if snapshot.state.is_null() { json!({}) } else { snapshot.state }
            }
            Err(_) => json!({}),
        };

        let new_id = self
            .registry
            .register_with_id(
                record.integration_id.clone(),
                RegisterRequest {
                    name: record.integration_name.clone(),
                    integration_type,
                    config,
                    options: RegisterOptions { skip_health_check: true, bypass_health_check: true, ..Default::default() },
                    handle,
                },
            )
            .await?;

        self.event_bus
            .publish(
                "reintegration.completed",
                json!({ "id": new_id, "deintegrationId": deintegration_id }),
                PublishOptions::default(),
            )
            .await?;

        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use crate::port_allocator::{PortAllocator, PortRange};
    use crate::registry::{RegisterOptions, RegisterRequest, RegistryConfig};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    fn test_registry() -> Arc<Registry> {
        let allocator = Arc::new(PortAllocator::new(PortRange { min: 25000, max: 25100 }));
        let bus = EventBus::new(100, "test-node");
        Registry::new(allocator, bus, RegistryConfig::default())
    }

    /// A handle whose `save_state`/`restore_state` round-trip the config
    /// it's constructed with, used to exercise the identity round-trip
    /// of save/restore.
    struct ConfigCapturingHandle {
        config: Mutex<Value>,
    }

    #[async_trait]
    impl IntegrationHandle for ConfigCapturingHandle {
        async fn save_state(&self) -> Result<Option<Value>> {
            Ok(Some(self.config.lock().await.clone()))
        }

        async fn restore_state(&self, state: &Value) -> Result<()> {
            *self.config.lock().await = state.clone();
            Ok(())
        }
    }

    async fn make_manager() -> (Arc<Registry>, Arc<DeintegrationManager>, tempfile::TempDir) {
        let registry = test_registry();
        let bus = Arc::clone(registry.event_bus());
        let dir = tempfile::tempdir().unwrap();
        let manager = DeintegrationManager::new(Arc::clone(&registry), bus, dir.path().to_path_buf());
        manager.ensure_directory().await.unwrap();
        (registry, manager, dir)
    }

    #[tokio::test]
    async fn immediate_policy_removes_record_and_releases_port() {
        let (registry, manager, _dir) = make_manager().await;

        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::ApiService,
            config: json!({ "apiUrl": "http://localhost:25010", "port": 25010 }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let id = registry.register(req).await.unwrap();

        let deintegration_id = manager
            .delete(&id, DeleteOptions { policy: CleanupPolicy::Immediate, preserve_data: false, force: false })
            .await
            .unwrap();

        let record = manager.get(&deintegration_id).await.unwrap();
        assert_eq!(record.status, DeintegrationStatus::Completed);
        assert!(matches!(registry.get(&id).await, Err(Error::NotFound(_))));

        // port is free again
        let reused = registry
            .register(RegisterRequest {
                name: "svc2".to_string(),
                integration_type: IntegrationType::ApiService,
                config: json!({ "apiUrl": "http://localhost:25010", "port": 25010 }),
                options: RegisterOptions { skip_health_check: true, ..Default::default() },
                handle: None,
            })
            .await
            .unwrap();
        let reused_record = registry.get(&reused).await.unwrap();
        assert_eq!(reused_record.allocated_port, Some(25010));
    }

    #[tokio::test]
    async fn deintegration_blocked_when_connections_are_live() {
        struct BusyHandle;
        #[async_trait]
        impl IntegrationHandle for BusyHandle {
            fn active_connections(&self) -> u32 {
                3
            }
        }

        let (registry, manager, _dir) = make_manager().await;
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: json!({ "connectionString": "postgres://x" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: Some(Arc::new(BusyHandle)),
        };
        let id = registry.register(req).await.unwrap();

        let result = manager.delete(&id, DeleteOptions::default()).await;
        assert!(matches!(result, Err(Error::DeintegrationBlocked(_))));
        // record still live
        assert!(registry.get(&id).await.is_ok());
    }

    #[tokio::test]
    async fn force_bypasses_validation() {
        struct BusyHandle;
        #[async_trait]
        impl IntegrationHandle for BusyHandle {
            fn active_connections(&self) -> u32 {
                3
            }
        }

        let (registry, manager, _dir) = make_manager().await;
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: json!({ "connectionString": "postgres://x" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: Some(Arc::new(BusyHandle)),
        };
        let id = registry.register(req).await.unwrap();

        let deintegration_id = manager
            .delete(&id, DeleteOptions { policy: CleanupPolicy::Immediate, preserve_data: false, force: true })
            .await
            .unwrap();
        let record = manager.get(&deintegration_id).await.unwrap();
        assert_eq!(record.status, DeintegrationStatus::Completed);
    }

    #[tokio::test]
    async fn manual_policy_awaits_confirmation_then_completes() {
        let (registry, manager, _dir) = make_manager().await;
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: json!({ "connectionString": "postgres://x" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let id = registry.register(req).await.unwrap();

        let deintegration_id = manager.delete(&id, DeleteOptions { policy: CleanupPolicy::Manual, ..Default::default() }).await.unwrap();
        let record = manager.get(&deintegration_id).await.unwrap();
        assert_eq!(record.status, DeintegrationStatus::AwaitingConfirmation);
        assert!(registry.get(&id).await.is_ok());

        manager.confirm_manual(&deintegration_id).await.unwrap();
        let record = manager.get(&deintegration_id).await.unwrap();
        assert_eq!(record.status, DeintegrationStatus::Completed);
        assert!(registry.get(&id).await.is_err());
    }

    #[tokio::test]
    async fn preserve_data_round_trips_config_through_reintegration() {
        let (registry, manager, _dir) = make_manager().await;
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: json!({ "connectionString": "postgres://x", "extra": "abc" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: Some(Arc::new(ConfigCapturingHandle { config: Mutex::new(json!({ "connectionString": "postgres://x", "extra": "abc" })) })),
        };
        let id = registry.register(req).await.unwrap();

        let deintegration_id = manager
            .delete(&id, DeleteOptions { policy: CleanupPolicy::Immediate, preserve_data: true, force: false })
            .await
            .unwrap();

        let new_handle = Arc::new(ConfigCapturingHandle { config: Mutex::new(Value::Null) });
        let new_id = manager.reintegrate(&deintegration_id, Some(new_handle)).await.unwrap();
        assert_eq!(new_id, id);

        let record = registry.get(&new_id).await.unwrap();
        assert_eq!(record.config.get("extra").and_then(|v| v.as_str()), Some("abc"));
    }

    #[tokio::test]
    async fn reintegrate_unknown_id_fails_with_record_not_found() {
        let (_registry, manager, _dir) = make_manager().await;
        let result = manager.reintegrate("nonexistent", None).await;
        assert!(matches!(result, Err(Error::RecordNotFound(_))));
    }
}
