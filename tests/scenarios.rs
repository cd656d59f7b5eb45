//! End-to-end scenario tests driven through the `hub-api` HTTP surface
//! wherever a scenario is naturally an HTTP client story, and directly
//! against `hub-core` where it exercises internals no HTTP route surfaces
//! (the event bus's wildcard matching and request/reply timeout).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hub_api::Config;
use hub_core::{DeintegrationManager, EventBus, PortAllocator, PortRange, Registry};

fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        port_range: PortRange { min: 25000, max: 25999 },
        port_probe_attempts: 50,
        event_bus_max_history: 100,
        event_bus_default_ttl_ms: None,
        deintegration_path: "unused".to_string(),
        auto_discovery_enabled: false,
        auto_discovery_scan_interval_ms: 60_000,
        health_check_default_interval_ms: 30_000,
        health_check_default_timeout_ms: 5_000,
        development_mode: true,
    }
}

async fn test_app(deintegration_path: std::path::PathBuf) -> (axum::Router, Arc<Registry>) {
    let config = Config {
        deintegration_path: deintegration_path.to_string_lossy().to_string(),
        ..test_config()
    };

    let allocator = Arc::new(PortAllocator::new(config.port_range));
    let bus = EventBus::new(config.event_bus_max_history, "scenario-test");
    let registry = Registry::new(allocator, Arc::clone(&bus), config.registry_config());
    let deintegration = DeintegrationManager::new(Arc::clone(&registry), bus, deintegration_path);
    deintegration.ensure_directory().await.unwrap();

    let app = hub_api::build_router(Arc::clone(&registry), deintegration, config);
    (app, registry)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Scenario 1: registering two `api-service` integrations that both want
/// the same port resolves the conflict by allocating the next free port
/// and rewriting the URL, never failing the second registration.
#[tokio::test]
async fn port_conflict_resolution_allocates_distinct_ports() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _registry) = test_app(tmp.path().to_path_buf()).await;

    let payload = json!({
        "name": "svc",
        "type": "api-service",
        "config": { "apiUrl": "http://localhost:25500", "port": 25500 },
        "options": { "skipHealthCheck": true }
    });

    let resp_a = app.clone().oneshot(post("/api/v1/integrations", payload.clone())).await.unwrap();
    assert_eq!(resp_a.status(), StatusCode::CREATED);
    let id_a = json_body(resp_a).await["id"].as_str().unwrap().to_string();

    let resp_b = app.clone().oneshot(post("/api/v1/integrations", payload)).await.unwrap();
    assert_eq!(resp_b.status(), StatusCode::CREATED);
    let id_b = json_body(resp_b).await["id"].as_str().unwrap().to_string();

    let get_a = app.clone().oneshot(Request::get(format!("/api/v1/integrations/{id_a}")).body(Body::empty()).unwrap()).await.unwrap();
    let record_a = json_body(get_a).await;
    assert_eq!(record_a["allocated_port"], json!(25500));

    let get_b = app.oneshot(Request::get(format!("/api/v1/integrations/{id_b}")).body(Body::empty()).unwrap()).await.unwrap();
    let record_b = json_body(get_b).await;
    assert_ne!(record_b["allocated_port"], json!(25500));
    assert_eq!(record_b["config"]["originalPort"], json!(25500));
    assert!(!record_b["config"]["apiUrl"].as_str().unwrap().contains(":25500"));
}

/// Scenario 2: an initial health probe against an unreachable endpoint
/// fails registration unless `bypassHealthCheck` is set, in which case the
/// record still comes up `active`.
#[tokio::test]
async fn initial_probe_failure_blocks_unless_bypassed() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _registry) = test_app(tmp.path().to_path_buf()).await;

    let unreachable = json!({
        "name": "dead-api",
        "type": "api-service",
        "config": { "apiUrl": "http://127.0.0.1:1" },
        "options": {}
    });

    let blocked = app.clone().oneshot(post("/api/v1/integrations", unreachable.clone())).await.unwrap();
    assert_eq!(blocked.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(blocked).await;
    assert_eq!(body["error"], json!("ServiceUnreachable"));

    let mut bypassed = unreachable;
    bypassed["options"] = json!({ "bypassHealthCheck": true });
    let resp = app.oneshot(post("/api/v1/integrations", bypassed)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

/// Scenario 3: a record transitions active -> unhealthy -> active as its
/// backing mock server starts failing and later recovers, driven by the
/// scheduled health prober rather than the inline registration probe.
#[tokio::test]
async fn active_unhealthy_active_transition_follows_scheduled_probe() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let (app, registry) = test_app(tmp.path().to_path_buf()).await;

    let payload = json!({
        "name": "flaky",
        "type": "api-service",
        "config": { "apiUrl": mock_server.uri() },
        "options": { "skipHealthCheck": true }
    });
    let resp = app.oneshot(post("/api/v1/integrations", payload)).await.unwrap();
    let id = json_body(resp).await["id"].as_str().unwrap().to_string();

    let record = registry.get(&id).await.unwrap();
    assert_eq!(record.status, hub_domain::IntegrationStatus::Active);

    let url = format!("{}/health", mock_server.uri());
    hub_core::health_prober::run_probe_and_record(&registry, &id, &url, Duration::from_secs(1)).await;
    let record = registry.get(&id).await.unwrap();
    assert_eq!(record.status, hub_domain::IntegrationStatus::Unhealthy);

    hub_core::health_prober::run_probe_and_record(&registry, &id, &url, Duration::from_secs(1)).await;
    let record = registry.get(&id).await.unwrap();
    assert_eq!(record.status, hub_domain::IntegrationStatus::Active);
}

/// Scenario 4: a wildcard subscription (`integration.*`) receives every
/// matching topic and nothing outside that prefix.
#[tokio::test]
async fn wildcard_subscription_receives_matching_topics_only() {
    let bus = EventBus::new(50, "scenario-test");
    let received = Arc::new(tokio::sync::Mutex::new(Vec::<String>::new()));
    let received_for_handler = Arc::clone(&received);

    let handler: hub_core::Handler = Arc::new(move |event| {
        let received = Arc::clone(&received_for_handler);
        Box::pin(async move {
            received.lock().await.push(event.topic.clone());
            Ok(())
        })
    });
    bus.subscribe("integration.*", handler, hub_core::SubscribeOptions::default());
    tokio::time::sleep(Duration::from_millis(20)).await;

    bus.publish("integration.registered", json!({}), hub_core::PublishOptions::default()).await.unwrap();
    bus.publish("deintegration.started", json!({}), hub_core::PublishOptions::default()).await.unwrap();
    bus.publish("integration.enabled", json!({}), hub_core::PublishOptions::default()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let seen = received.lock().await.clone();
    assert_eq!(seen, vec!["integration.registered", "integration.enabled"]);
}

/// Scenario 5: a request with no responder times out with a stable error
/// and leaves no dangling subscription behind.
#[tokio::test]
async fn request_reply_times_out_cleanly_without_a_responder() {
    let bus = EventBus::new(50, "scenario-test");
    let baseline = bus.subscriber_count().await;

    let result = bus.request("nobody.listening", json!({}), 50).await;
    assert!(result.is_err());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bus.subscriber_count().await, baseline);
}

/// Scenario 6: deleting an integration with `preserveData=true` snapshots
/// its handle state to disk, and reintegrating restores that exact state.
///
/// Driven directly against `hub-core` rather than through `hub-api`: the
/// HTTP registration surface never accepts a caller-supplied
/// `IntegrationHandle` (handle injection is a Rust-API concept, not an
/// HTTP one), so a meaningful state round-trip needs a handle that
/// actually captures something, the same way the in-crate deintegration
/// tests do.
#[tokio::test]
async fn deintegration_preserves_and_restores_state_on_reintegrate() {
    use async_trait::async_trait;
    use hub_core::{IntegrationHandle, RegisterOptions, RegisterRequest, RegistryConfig};
    use tokio::sync::Mutex as AsyncMutex;

    struct ConfigCapturingHandle {
        config: AsyncMutex<Value>,
    }

    #[async_trait]
    impl IntegrationHandle for ConfigCapturingHandle {
        async fn save_state(&self) -> hub_common::Result<Option<Value>> {
            Ok(Some(self.config.lock().await.clone()))
        }

        async fn restore_state(&self, state: &Value) -> hub_common::Result<()> {
            *self.config.lock().await = state.clone();
            Ok(())
        }
    }

    let allocator = Arc::new(PortAllocator::new(PortRange { min: 26000, max: 26100 }));
    let bus = EventBus::new(100, "scenario-test");
    let registry = Registry::new(allocator, Arc::clone(&bus), RegistryConfig::default());
    let tmp = tempfile::tempdir().unwrap();
    let deintegration = DeintegrationManager::new(Arc::clone(&registry), bus, tmp.path().to_path_buf());
    deintegration.ensure_directory().await.unwrap();

    let config = json!({ "connectionString": "postgres://x/state" });
    let id = registry
        .register(RegisterRequest {
            name: "stateful-db".to_string(),
            integration_type: hub_domain::IntegrationType::Database,
            config: config.clone(),
            options: RegisterOptions { skip_health_check: true, ..Default::default() },
            handle: Some(Arc::new(ConfigCapturingHandle { config: AsyncMutex::new(config) })),
        })
        .await
        .unwrap();

    let deintegration_id = deintegration
        .delete(&id, hub_core::DeleteOptions { preserve_data: true, ..Default::default() })
        .await
        .unwrap();
    assert!(registry.get(&id).await.is_err());

    let new_handle = Arc::new(ConfigCapturingHandle { config: AsyncMutex::new(Value::Null) });
    let new_id = deintegration.reintegrate(&deintegration_id, Some(new_handle)).await.unwrap();
    assert_eq!(new_id, id);

    let record = registry.get(&new_id).await.unwrap();
    assert_eq!(record.config["connectionString"], json!("postgres://x/state"));
}
