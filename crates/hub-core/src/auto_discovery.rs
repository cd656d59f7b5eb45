//! Auto-Discovery Scanner.
//!
//! A periodic task that asks an external `ServiceManager` collaborator for
//! candidate integratables and registers the ones not already known. The
//! collaborator itself is out of scope, so it's modeled as a
//! trait with a static in-memory implementation for tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hub_domain::IntegrationType;

use crate::registry::{RegisterOptions, RegisterRequest, Registry};

/// Default scan period.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A candidate integratable reported by the Service Manager.
#[derive(Debug, Clone)]
pub struct DiscoveryCandidate {
    pub key: String,
    pub name: String,
    pub integratable: bool,
    pub config: Value,
    /// Present iff the candidate advertises an OpenAPI endpoint.
    pub openapi_document: Option<Value>,
}

/// The external collaborator this scanner polls. Out of scope per the
/// spec's Non-goals — only the seam is implemented here.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn list_candidates(&self) -> Vec<DiscoveryCandidate>;
}

/// An in-memory `ServiceManager` for tests: candidates are supplied up
/// front and never change between scans.
pub struct StaticServiceManager {
    candidates: Vec<DiscoveryCandidate>,
}

impl StaticServiceManager {
    pub fn new(candidates: Vec<DiscoveryCandidate>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl ServiceManager for StaticServiceManager {
    async fn list_candidates(&self) -> Vec<DiscoveryCandidate> {
        self.candidates.clone()
    }
}

pub struct AutoDiscoveryScanner {
    registry: Arc<Registry>,
    service_manager: Arc<dyn ServiceManager>,
    interval: Duration,
    seen: RwLock<HashSet<String>>,
}

impl AutoDiscoveryScanner {
    pub fn new(registry: Arc<Registry>, service_manager: Arc<dyn ServiceManager>, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            registry,
            service_manager,
            interval,
            seen: RwLock::new(HashSet::new()),
        })
    }

    /// Spawns the periodic scan task. The returned handle can be
    /// `.abort()`-ed to disable the scanner.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                this.scan_once().await;
            }
        })
    }

    /// Runs a single scan. A failure to register one candidate is logged
    /// and does not stop the rest of the batch.
    pub async fn scan_once(&self) {
        let candidates = self.service_manager.list_candidates().await;
        for candidate in candidates {
            if !candidate.integratable {
                continue;
            }
            if self.seen.read().await.contains(&candidate.key) {
                continue;
            }

            let integration_type = if candidate.openapi_document.is_some() {
                IntegrationType::Openapi
            } else {
                IntegrationType::ApiService
            };

            let mut config = candidate.config.clone();
            if let (IntegrationType::Openapi, Some(doc), Some(obj)) =
                (integration_type, candidate.openapi_document.clone(), config.as_object_mut())
            {
                obj.insert("openApiDocument".to_string(), doc);
            }

            let req = RegisterRequest {
                name: candidate.name.clone(),
                integration_type,
                config,
                // Health prober takes over once armed; skip the inline probe here.
                options: RegisterOptions { auto_detect_port: true, skip_health_check: true, ..Default::default() },
                handle: None,
            };

            match self.registry.register(req).await {
                Ok(id) => {
                    info!(key = %candidate.key, integration_id = %id, %integration_type, "auto-discovered integration registered");
                    self.seen.write().await.insert(candidate.key.clone());
                }
                Err(e) => {
                    warn!(key = %candidate.key, error = %e, "auto-discovery registration failed, skipping candidate");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBus;
    use crate::port_allocator::{PortAllocator, PortRange};
    use crate::registry::RegistryConfig;
    use serde_json::json;

    fn test_registry() -> Arc<Registry> {
        let allocator = Arc::new(PortAllocator::new(PortRange { min: 26000, max: 26100 }));
        let bus = EventBus::new(100, "test-node");
        Registry::new(allocator, bus, RegistryConfig::default())
    }

    #[tokio::test]
    async fn registers_non_integratable_and_duplicates_are_skipped() {
        let registry = test_registry();
        let candidates = vec![
            DiscoveryCandidate {
                key: "svc-a".to_string(),
                name: "svc-a".to_string(),
                integratable: true,
                config: json!({ "apiUrl": "http://localhost:26010" }),
                openapi_document: None,
            },
            DiscoveryCandidate {
                key: "svc-b".to_string(),
                name: "svc-b".to_string(),
                integratable: false,
                config: json!({ "apiUrl": "http://localhost:26011" }),
                openapi_document: None,
            },
        ];
        let manager = Arc::new(StaticServiceManager::new(candidates));
        let scanner = AutoDiscoveryScanner::new(Arc::clone(&registry), manager, DEFAULT_SCAN_INTERVAL);

        scanner.scan_once().await;
        let records = registry.list(Default::default()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "svc-a");

        // a second scan with the same candidates does not re-register
        scanner.scan_once().await;
        let records = registry.list(Default::default()).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn openapi_candidates_prefer_openapi_type() {
        let registry = test_registry();
        let candidates = vec![DiscoveryCandidate {
            key: "svc-openapi".to_string(),
            name: "svc-openapi".to_string(),
            integratable: true,
            config: json!({ "specUrl": "http://localhost:26020/openapi.json" }),
            openapi_document: Some(json!({ "paths": {} })),
        }];
        let manager = Arc::new(StaticServiceManager::new(candidates));
        let scanner = AutoDiscoveryScanner::new(Arc::clone(&registry), manager, DEFAULT_SCAN_INTERVAL);

        scanner.scan_once().await;
        let records = registry.list(Default::default()).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].integration_type, IntegrationType::Openapi);
    }
}
