//! Integration Registry & Lifecycle Manager.
//!
//! Owns the map of integration records, drives the validation/port/health
//! pipeline in `register`, and exposes the primitives the Health Prober
//! and Deintegration Manager build on.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use hub_common::{Error, Result};
use hub_domain::{HealthCheckConfig, IntegrationMetrics, IntegrationRecord, IntegrationStatus, IntegrationType};

use crate::catalog::{self, TypeCatalogEntry};
use crate::event_bus::{EventBus, PublishOptions};
use crate::handle::{IntegrationHandle, NoopHandle};
use crate::health_prober;
use crate::port_allocator::PortAllocator;
use crate::webhook_deliverer::WebhookSink;

#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub skip_health_check: bool,
    pub auto_detect_port: bool,
    pub bypass_health_check: bool,
}

pub struct RegisterRequest {
    pub name: String,
    pub integration_type: IntegrationType,
    pub config: Value,
    pub options: RegisterOptions,
    /// Capability-set collaborator for type-specific init/cleanup/actions.
    /// Defaults to a no-op handle when the caller doesn't supply one (the
    /// common case for types with no real adapter wired in).
    pub handle: Option<Arc<dyn IntegrationHandle>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub integration_type: Option<IntegrationType>,
    pub status: Option<IntegrationStatus>,
    pub tag: Option<String>,
}

#[derive(Clone)]
pub struct RegistryConfig {
    pub development_mode: bool,
    pub default_health_interval_ms: u64,
    pub default_health_timeout_ms: u64,
    pub port_probe_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            development_mode: false,
            default_health_interval_ms: 30_000,
            default_health_timeout_ms: 5_000,
            port_probe_attempts: 100,
        }
    }
}

struct RecordEntry {
    record: Mutex<IntegrationRecord>,
    handle: Arc<dyn IntegrationHandle>,
}

/// Process-wide registry singleton.
pub struct Registry {
    records: RwLock<HashMap<String, Arc<RecordEntry>>>,
    probe_tasks: RwLock<HashMap<String, JoinHandle<()>>>,
    webhook_subscriptions: RwLock<HashMap<String, Vec<crate::event_bus::Subscription>>>,
    port_allocator: Arc<PortAllocator>,
    event_bus: Arc<EventBus>,
    config: RegistryConfig,
    self_ref: Weak<Registry>,
    webhook_sink: RwLock<Option<Arc<dyn WebhookSink>>>,
}

impl Registry {
    pub fn new(port_allocator: Arc<PortAllocator>, event_bus: Arc<EventBus>, config: RegistryConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            records: RwLock::new(HashMap::new()),
            probe_tasks: RwLock::new(HashMap::new()),
            webhook_subscriptions: RwLock::new(HashMap::new()),
            port_allocator,
            event_bus,
            config,
            self_ref: weak.clone(),
            webhook_sink: RwLock::new(None),
        })
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn port_allocator(&self) -> &Arc<PortAllocator> {
        &self.port_allocator
    }

    /// Wires the Webhook Deliverer in after construction, the same way
    /// `EventBus::set_transport` injects its optional distributed
    /// transport. Until this is called, webhook subscriptions exist
    /// (`subscribedTopics` is live) but nothing is actually delivered.
    pub async fn set_webhook_sink(&self, sink: Arc<dyn WebhookSink>) {
        *self.webhook_sink.write().await = Some(sink);
    }

    fn arc(&self) -> Arc<Registry> {
        self.self_ref.upgrade().expect("registry dropped while in use")
    }

    /// Register a new integration. Steps are numbered in the comments
    /// below in the order they run.
    pub async fn register(self: &Arc<Self>, req: RegisterRequest) -> Result<String> {
        self.register_with_id(Uuid::new_v4().to_string(), req).await
    }

    /// Like `register`, but reuses a caller-chosen id. Used by
    /// reintegration to restore an integration under its
    /// original id.
    pub async fn register_with_id(self: &Arc<Self>, id: String, req: RegisterRequest) -> Result<String> {
        // 1. reject on missing name/type (type is a closed Rust enum so
        // only `name` can be empty at this layer; string-to-enum parsing
        // at the HTTP boundary is where `InvalidType` is actually raised).
        if req.name.trim().is_empty() {
            return Err(Error::MissingField {
                ty: req.integration_type.to_string(),
                field: "name".to_string(),
            });
        }

        // 2. look up typeConfig
        let entry = catalog::lookup(req.integration_type);

        // 3. required fields present
        for field in entry.required_fields {
            if !has_non_null_field(&req.config, field) {
                return Err(Error::MissingField {
                    ty: req.integration_type.to_string(),
                    field: field.to_string(),
                });
            }
        }

        let mut config = req.config;

        // 4 & 5. port allocation + conflict resolution.
        let desired_port = config_port(&config).or_else(|| {
            if req.options.auto_detect_port {
                entry.default_port
            } else {
                None
            }
        });

        let mut allocated_port = None;
        if let Some(desired) = desired_port {
            let allocated = match self
                .port_allocator
                .find_and_acquire(desired, self.config.port_probe_attempts, &id)
                .await
            {
                Ok(p) => p,
                Err(e) => return Err(e),
            };
            if allocated != desired {
                set_config_value(&mut config, "originalPort", serde_json::json!(desired));
                rewrite_port_in_urls(&mut config, desired, allocated);
            }
            set_config_value(&mut config, "port", serde_json::json!(allocated));
            allocated_port = Some(allocated);
        }

        let release_port = |port: Option<u16>| {
            let allocator = Arc::clone(&self.port_allocator);
            async move {
                if let Some(p) = port {
                    allocator.release(p).await;
                }
            }
        };

        // 6. initial health probe, unless skipped.
        if !req.options.skip_health_check {
            if let Some(probe_url) = health_prober::probe_url(&config, &entry) {
                let outcome = health_prober::probe_once(&probe_url, entry.health_timeout).await;
                if outcome.is_err() && !req.options.bypass_health_check && !self.config.development_mode {
                    release_port(allocated_port).await;
                    return Err(Error::ServiceUnreachable(probe_url));
                }
            }
        }

        // 7. type-specific initialization.
        let handle = req.handle.unwrap_or_else(|| Arc::new(NoopHandle));
        if let Err(e) = self.type_specific_init(req.integration_type, &mut config, &handle).await {
            release_port(allocated_port).await;
            return Err(Error::RegistrationFailed(e.to_string()));
        }

        let now = Utc::now();
        let interval_ms = config
            .get("healthCheck")
            .and_then(|h| h.get("intervalMs"))
            .and_then(|v| v.as_u64())
            .unwrap_or_else(|| catalog::default_interval_ms(&entry, self.config.default_health_interval_ms));
        let health_check = HealthCheckConfig {
            url: health_prober::probe_url(&config, &entry),
            interval_ms,
            timeout_ms: entry.health_timeout.as_millis() as u64,
            enabled: entry.health_path.is_some(),
        };

        let record = IntegrationRecord {
            id: id.clone(),
            name: req.name,
            integration_type: req.integration_type,
            config,
            status: IntegrationStatus::Active,
            allocated_port,
            original_port: config_original_port_of(desired_port, allocated_port),
            health_check,
            metrics: IntegrationMetrics::default(),
            created_at: now,
            updated_at: now,
            registered_at: Some(now),
            subscribed_topics: Default::default(),
            delivery_log: Vec::new(),
            generation: 0,
        };

        // webhook: subscribe before insertion so subscriptions are ready
        // the instant the record becomes visible.
        if req.integration_type == IntegrationType::Webhook {
            self.arm_webhook_subscriptions(&id, &record).await;
        }

        // 8. insert; emit; arm prober.
        {
            let mut records = self.records.write().await;
            records.insert(
                id.clone(),
                Arc::new(RecordEntry {
                    record: Mutex::new(record),
                    handle,
                }),
            );
        }

        info!(integration_id = %id, %req.integration_type, "integration registered");
        self.event_bus
            .publish(
                "integration.registered",
                serde_json::json!({ "id": id, "type": req.integration_type.as_str() }),
                PublishOptions::default(),
            )
            .await?;

        if entry.health_path.is_some() {
            self.arm_prober(id.clone(), entry, interval_ms).await;
        }

        Ok(id)
    }

    async fn type_specific_init(
        &self,
        ty: IntegrationType,
        config: &mut Value,
        handle: &Arc<dyn IntegrationHandle>,
    ) -> std::result::Result<(), String> {
        match ty {
            IntegrationType::Openapi => {
                let endpoints = extract_openapi_endpoints(config);
                set_config_value(config, "endpoints", serde_json::json!(endpoints));
                handle.initialize().await.map_err(|e| e.to_string())
            }
            IntegrationType::Plugin => {
                let source_kind = config
                    .get("source")
                    .and_then(|s| s.get("type"))
                    .and_then(|t| t.as_str());
                match source_kind {
                    Some("npm") | Some("local") | Some("url") => handle.initialize().await.map_err(|e| e.to_string()),
                    other => Err(format!("unsupported plugin source type: {other:?}")),
                }
            }
            IntegrationType::Database | IntegrationType::MessageQueue => {
                handle.initialize().await.map_err(|e| e.to_string())
            }
            IntegrationType::Webhook | IntegrationType::WebUi | IntegrationType::DevelopmentTool | IntegrationType::ApiService => {
                handle.initialize().await.map_err(|e| e.to_string())
            }
        }
    }

    async fn arm_webhook_subscriptions(&self, id: &str, record: &IntegrationRecord) {
        let topics: Vec<String> = record
            .config
            .get("events")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let bus = Arc::clone(&self.event_bus);
        let id_owned = id.to_string();
        let mut subs = Vec::with_capacity(topics.len());
        for topic in &topics {
            let target_id = id_owned.clone();
            let sink_source: Weak<Registry> = self.self_ref.clone();
            let handler: crate::event_bus::Handler = Arc::new(move |event| {
                let target_id = target_id.clone();
                let sink_source = sink_source.clone();
                Box::pin(async move {
                    let Some(registry) = sink_source.upgrade() else {
                        return Ok(());
                    };
                    let sink = registry.webhook_sink.read().await.clone();
                    if let Some(sink) = sink {
                        sink.deliver(&target_id, &event).await?;
                    }
                    Ok(())
                })
            });
            subs.push(bus.subscribe(topic.clone(), handler, crate::event_bus::SubscribeOptions::default()));
        }

        self.webhook_subscriptions.write().await.insert(id_owned, subs);
    }

    async fn arm_prober(self: &Arc<Self>, id: String, entry: TypeCatalogEntry, interval_ms: u64) {
        let registry = Arc::downgrade(self);
        let task = health_prober::spawn(registry, id.clone(), entry, interval_ms);
        self.probe_tasks.write().await.insert(id, task);
    }

    async fn cancel_background_tasks(&self, id: &str) {
        if let Some(task) = self.probe_tasks.write().await.remove(id) {
            task.abort();
        }
        if let Some(subs) = self.webhook_subscriptions.write().await.remove(id) {
            for sub in subs {
                sub.cancel();
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<IntegrationRecord> {
        let entry = self.lookup_entry(id).await?;
        Ok(entry.record.lock().await.clone())
    }

    pub async fn list(&self, filter: ListFilter) -> Vec<IntegrationRecord> {
        let records = self.records.read().await;
        let mut out = Vec::new();
        for entry in records.values() {
            let record = entry.record.lock().await.clone();
            if let Some(ty) = filter.integration_type {
                if record.integration_type != ty {
                    continue;
                }
            }
            if let Some(status) = filter.status {
                if record.status != status {
                    continue;
                }
            }
            if let Some(tag) = &filter.tag {
                let matches_tag = record.config.get("tag").and_then(|v| v.as_str()) == Some(tag.as_str());
                if !matches_tag {
                    continue;
                }
            }
            out.push(record);
        }
        out
    }

    pub async fn update_config(self: &Arc<Self>, id: &str, patch: Value) -> Result<IntegrationRecord> {
        let entry = self.lookup_entry(id).await?;
        let mut record = entry.record.lock().await;

        if record.status == IntegrationStatus::Removed {
            return Err(Error::Immutable(id.to_string()));
        }

        if let (Some(obj), Some(patch_obj)) = (record.config.as_object_mut(), patch.as_object()) {
            for (k, v) in patch_obj {
                obj.insert(k.clone(), v.clone());
            }
        }

        let catalog_entry = catalog::lookup(record.integration_type);
        for field in catalog_entry.required_fields {
            if !has_non_null_field(&record.config, field) {
                return Err(Error::MissingField {
                    ty: record.integration_type.to_string(),
                    field: field.to_string(),
                });
            }
        }

        record.updated_at = Utc::now();
        record.generation += 1;
        let snapshot = record.clone();
        drop(record);

        // Re-probe in the background; the prober task will pick up the
        // new config on its next scheduled tick, so this is best-effort
        // and does not block the caller.
        if let Some(url) = snapshot.health_check.url.clone() {
            let registry = Arc::downgrade(self);
            let id_owned = id.to_string();
            let timeout_ms = snapshot.health_check.timeout_ms;
            tokio::spawn(async move {
                if let Some(registry) = registry.upgrade() {
                    health_prober::run_probe_and_record(&registry, &id_owned, &url, std::time::Duration::from_millis(timeout_ms)).await;
                }
            });
        }

        Ok(snapshot)
    }

    pub async fn enable(&self, id: &str) -> Result<IntegrationStatus> {
        let entry = self.lookup_entry(id).await?;
        let mut record = entry.record.lock().await;
        match record.status {
            IntegrationStatus::Removed => return Err(Error::Immutable(id.to_string())),
            IntegrationStatus::Disabled => {
                record.status = IntegrationStatus::Active;
                record.updated_at = Utc::now();
                record.generation += 1;
                let status = record.status;
                drop(record);
                self.rearm_after_enable(id).await;
                self.event_bus
                    .publish("integration.enabled", serde_json::json!({ "id": id }), PublishOptions::default())
                    .await?;
                Ok(status)
            }
            other => Ok(other),
        }
    }

    async fn rearm_after_enable(&self, id: &str) {
        let entry = match self.lookup_entry(id).await {
            Ok(e) => e,
            Err(_) => return,
        };
        let record = entry.record.lock().await;
        let entry_catalog = catalog::lookup(record.integration_type);
        if entry_catalog.health_path.is_none() || self.probe_tasks.read().await.contains_key(id) {
            return;
        }
        let interval_ms = record.health_check.interval_ms;
        drop(record);
        if let Some(registry) = self.self_ref.upgrade() {
            registry.arm_prober(id.to_string(), entry_catalog, interval_ms).await;
        }
    }

    pub async fn disable(&self, id: &str) -> Result<IntegrationStatus> {
        let entry = self.lookup_entry(id).await?;
        let mut record = entry.record.lock().await;
        match record.status {
            IntegrationStatus::Removed => return Err(Error::Immutable(id.to_string())),
            IntegrationStatus::Disabled => Ok(IntegrationStatus::Disabled),
            _ => {
                record.status = IntegrationStatus::Disabled;
                record.updated_at = Utc::now();
                record.generation += 1;
                drop(record);
                self.cancel_background_tasks(id).await;
                self.event_bus
                    .publish("integration.disabled", serde_json::json!({ "id": id }), PublishOptions::default())
                    .await?;
                Ok(IntegrationStatus::Disabled)
            }
        }
    }

    async fn lookup_entry(&self, id: &str) -> Result<Arc<RecordEntry>> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub async fn handle_for(&self, id: &str) -> Result<Arc<dyn IntegrationHandle>> {
        Ok(Arc::clone(&self.lookup_entry(id).await?.handle))
    }

    pub async fn active_connections(&self, id: &str) -> Result<u32> {
        Ok(self.handle_for(id).await?.active_connections())
    }

    pub async fn pending_operations(&self, id: &str) -> Result<u32> {
        Ok(self.handle_for(id).await?.pending_operations())
    }

    /// Dependency-graph lookup for dependents of `id`. The dependency
    /// graph itself is outside this crate's scope; reporting zero dependents
    /// here means the Validate step only ever blocks on live connections
    /// or pending operations, never on dependents, absent a real graph.
    pub async fn dependents_of(&self, _id: &str) -> Vec<String> {
        Vec::new()
    }

    /// Used internally by the Health Prober: writes back a probe outcome
    /// iff the record is still live and its generation hasn't moved on
    /// since the probe started (in-flight probe racing a removal has its
    /// result discarded).
    pub async fn apply_probe_outcome(
        &self,
        id: &str,
        expected_generation: u64,
        outcome: std::result::Result<(), String>,
    ) {
        let entry = match self.lookup_entry(id).await {
            Ok(e) => e,
            Err(_) => return,
        };
        let mut record = entry.record.lock().await;
        if record.generation != expected_generation || !record.is_live() {
            return;
        }

        let now = Utc::now();
        record.metrics.last_health_check_at = Some(now);
        record.metrics.health_total += 1;

        match outcome {
            Ok(()) => {
                record.metrics.health_ok += 1;
                record.metrics.last_health_error = None;
                if record.status == IntegrationStatus::Unhealthy {
                    record.status = IntegrationStatus::Active;
                    record.generation += 1;
                    drop(record);
                    let _ = self
                        .event_bus
                        .publish("integration.recovered", serde_json::json!({ "id": id }), PublishOptions::default())
                        .await;
                    return;
                }
            }
            Err(reason) => {
                record.metrics.health_fail += 1;
                record.metrics.last_health_error = Some(reason);
                if record.status == IntegrationStatus::Active {
                    record.status = IntegrationStatus::Unhealthy;
                    record.generation += 1;
                    drop(record);
                    let _ = self
                        .event_bus
                        .publish("integration.unhealthy", serde_json::json!({ "id": id }), PublishOptions::default())
                        .await;
                    return;
                }
            }
        }
    }

    /// Appends a webhook delivery outcome to a record's bounded log
    ///, evicting the oldest entry once `capacity` is reached.
    pub async fn record_delivery(&self, id: &str, entry: hub_domain::DeliveryLogEntry, capacity: usize) {
        let Ok(entry_ref) = self.lookup_entry(id).await else {
            return;
        };
        let mut record = entry_ref.record.lock().await;
        if record.delivery_log.len() >= capacity {
            record.delivery_log.remove(0);
        }
        record.metrics.requests += 1;
        if entry.error_kind.is_some() {
            record.metrics.errors += 1;
        }
        record.delivery_log.push(entry);
    }

    pub async fn current_generation(&self, id: &str) -> Option<u64> {
        let entry = self.lookup_entry(id).await.ok()?;
        Some(entry.record.lock().await.generation)
    }

    pub async fn is_live(&self, id: &str) -> bool {
        match self.lookup_entry(id).await {
            Ok(entry) => entry.record.lock().await.is_live(),
            Err(_) => false,
        }
    }

    /// Removes the record from the map, cancels its background tasks,
    /// and releases its port. Called by the Deintegration Manager at the
    /// end of its pipeline or on a failed pipeline.
    pub async fn finalize_removal(&self, id: &str) -> Result<IntegrationRecord> {
        self.cancel_background_tasks(id).await;
        let entry = self.records.write().await.remove(id).ok_or_else(|| Error::NotFound(id.to_string()))?;
        let mut record = entry.record.lock().await;
        if let Some(port) = record.allocated_port.take() {
            self.port_allocator.release(port).await;
        }
        record.status = IntegrationStatus::Removed;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    pub async fn mark_failed(&self, id: &str, reason: &str) {
        if let Ok(entry) = self.lookup_entry(id).await {
            let mut record = entry.record.lock().await;
            record.status = IntegrationStatus::Failed;
            record.metrics.last_health_error = Some(reason.to_string());
            record.updated_at = Utc::now();
            warn!(integration_id = %id, reason, "integration marked failed");
        }
    }
}

fn config_port(config: &Value) -> Option<u16> {
    config.get("port").and_then(|v| v.as_u64()).map(|p| p as u16)
}

fn config_original_port_of(desired: Option<u16>, allocated: Option<u16>) -> Option<u16> {
    match (desired, allocated) {
        (Some(d), Some(a)) if d != a => Some(d),
        _ => None,
    }
}

fn set_config_value(config: &mut Value, key: &str, value: Value) {
    if let Some(obj) = config.as_object_mut() {
        obj.insert(key.to_string(), value);
    }
}

fn rewrite_port_in_urls(config: &mut Value, old_port: u16, new_port: u16) {
    let needle = format!(":{old_port}");
    let replacement = format!(":{new_port}");
    if let Some(obj) = config.as_object_mut() {
        for key in ["apiUrl", "url"] {
            if let Some(Value::String(s)) = obj.get_mut(key) {
                if s.contains(&needle) {
                    *s = s.replace(&needle, &replacement);
                }
            }
        }
    }
}

fn has_non_null_field(config: &Value, field: &str) -> bool {
    !matches!(config.get(field), None | Some(Value::Null))
}

const HTTP_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Path × method cross-product from a supplied OpenAPI document,
/// restricted to the methods a registration may declare.
fn extract_openapi_endpoints(config: &Value) -> Vec<Value> {
    let Some(doc) = config.get("openApiDocument") else {
        return Vec::new();
    };
    let Some(paths) = doc.get("paths").and_then(|p| p.as_object()) else {
        return Vec::new();
    };

    let mut endpoints = Vec::new();
    for (path, operations) in paths {
        let Some(ops) = operations.as_object() else { continue };
        for method in HTTP_METHODS {
            if ops.contains_key(method) {
                endpoints.push(serde_json::json!({ "path": path, "method": method.to_uppercase() }));
            }
        }
    }
    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> Arc<Registry> {
        let allocator = Arc::new(PortAllocator::new(crate::port_allocator::PortRange { min: 23000, max: 23100 }));
        let bus = EventBus::new(100, "test-node");
        Registry::new(allocator, bus, RegistryConfig::default())
    }

    #[tokio::test]
    async fn register_rejects_missing_name() {
        let registry = test_registry();
        let req = RegisterRequest {
            name: "".to_string(),
            integration_type: IntegrationType::WebUi,
            config: serde_json::json!({ "url": "http://localhost:1" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let result = registry.register(req).await;
        assert!(matches!(result, Err(Error::MissingField { .. })));
    }

    #[tokio::test]
    async fn register_rejects_missing_required_field() {
        let registry = test_registry();
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: serde_json::json!({}),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let result = registry.register(req).await;
        assert!(matches!(result, Err(Error::MissingField { .. })));
    }

    #[tokio::test]
    async fn register_with_skip_health_check_succeeds_and_enable_disable_are_idempotent() {
        let registry = test_registry();
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: serde_json::json!({ "connectionString": "postgres://x" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let id = registry.register(req).await.unwrap();
        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.status, IntegrationStatus::Active);

        assert_eq!(registry.disable(&id).await.unwrap(), IntegrationStatus::Disabled);
        assert_eq!(registry.disable(&id).await.unwrap(), IntegrationStatus::Disabled);
        assert_eq!(registry.enable(&id).await.unwrap(), IntegrationStatus::Active);
        assert_eq!(registry.enable(&id).await.unwrap(), IntegrationStatus::Active);
    }

    #[tokio::test]
    async fn port_conflict_resolution_allocates_next_port_and_rewrites_urls() {
        let registry = test_registry();
        let req_a = RegisterRequest {
            name: "a".to_string(),
            integration_type: IntegrationType::ApiService,
            config: serde_json::json!({ "apiUrl": "http://localhost:23050", "port": 23050 }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let id_a = registry.register(req_a).await.unwrap();
        let record_a = registry.get(&id_a).await.unwrap();
        assert_eq!(record_a.allocated_port, Some(23050));

        let req_b = RegisterRequest {
            name: "b".to_string(),
            integration_type: IntegrationType::ApiService,
            config: serde_json::json!({ "apiUrl": "http://localhost:23050", "port": 23050 }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let id_b = registry.register(req_b).await.unwrap();
        let record_b = registry.get(&id_b).await.unwrap();

        assert_ne!(record_b.allocated_port, Some(23050));
        assert_eq!(record_b.config.get("originalPort").and_then(|v| v.as_u64()), Some(23050));
        let rewritten = record_b.config.get("apiUrl").and_then(|v| v.as_str()).unwrap();
        assert!(!rewritten.contains(":23050"));
    }

    #[tokio::test]
    async fn update_config_rejects_on_removed_record() {
        let registry = test_registry();
        let req = RegisterRequest {
            name: "svc".to_string(),
            integration_type: IntegrationType::Database,
            config: serde_json::json!({ "connectionString": "postgres://x" }),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: None,
        };
        let id = registry.register(req).await.unwrap();
        registry.finalize_removal(&id).await.unwrap();

        // record is gone from the map entirely after finalize_removal, so
        // update_config surfaces NotFound rather than Immutable here;
        // Immutable applies to records visible in the map with
        // status==removed, which Delete always finalizes past.
        let result = registry.update_config(&id, serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
