//! Webhook Deliverer.
//!
//! Ties the Event Bus to the Registry: subscribes to topics on behalf of
//! `webhook`-type integrations and POSTs a JSON-serialized event to
//! `config.url` whenever one matches. Runs on a bounded worker pool so a
//! burst of events can never starve the bus's own dispatch loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use hub_common::{Error, Result, sign_hmac};
use hub_domain::{DeliveryLogEntry, Event, IntegrationStatus, IntegrationType};

use crate::registry::Registry;

const DEFAULT_USER_AGENT: &str = "integration-hub-webhook-deliverer/1.0";

/// Injected into the Registry so its webhook subscriptions can hand events
/// off to the real delivery path without `hub-core`'s registry module
/// needing to know about HTTP (mirrors how `EventBus::set_transport`
/// injects the distributed transport).
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, integration_id: &str, event: &Event) -> Result<()>;
}

pub struct WebhookDelivererConfig {
    pub http_timeout: Duration,
    pub max_concurrent_deliveries: usize,
    pub delivery_log_capacity: usize,
}

impl Default for WebhookDelivererConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(10),
            max_concurrent_deliveries: 50,
            delivery_log_capacity: 100,
        }
    }
}

pub struct WebhookDeliverer {
    registry: Arc<Registry>,
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    delivery_log_capacity: usize,
}

impl WebhookDeliverer {
    pub fn new(registry: Arc<Registry>, config: WebhookDelivererConfig) -> Arc<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Arc::new(Self {
            registry,
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_deliveries)),
            delivery_log_capacity: config.delivery_log_capacity,
        })
    }

    /// The actual HTTP delivery, run off the bus's dispatch task on a
    /// semaphore-bounded pool. Never returns an error to its caller —
    /// outcomes are recorded on the target record's delivery log instead;
    /// failures do not retry at this layer.
    async fn deliver_now(self: Arc<Self>, integration_id: String, event: Event) {
        let record = match self.registry.get(&integration_id).await {
            Ok(r) => r,
            Err(_) => return,
        };

        // Spec §3 invariant 4: only a live, active record is eligible.
        if record.integration_type != IntegrationType::Webhook || record.status != IntegrationStatus::Active {
            return;
        }

        let Some(url) = record.config.get("url").and_then(|v| v.as_str()).map(str::to_string) else {
            return;
        };

        let body = match serde_json::to_string(&event) {
            Ok(b) => b,
            Err(e) => {
                warn!(integration_id = %integration_id, error = %e, "failed to serialize event for webhook delivery");
                return;
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(custom) = record.config.get("headers").and_then(|v| v.as_object()) {
            for (k, v) in custom {
                if let (Some(name_str), Some(val_str)) = (Some(k.as_str()), v.as_str()) {
                    if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name_str.as_bytes()), HeaderValue::from_str(val_str)) {
                        headers.insert(name, value);
                    }
                }
            }
        }
        if let Some(secret) = record.config.get("secret").and_then(|v| v.as_str()) {
            let signature = sign_hmac(&body, secret);
            headers.insert(
                HeaderName::from_static("x-hub-signature-256"),
                HeaderValue::from_str(&format!("sha256={signature}")).unwrap_or(HeaderValue::from_static("")),
            );
        }

        let started = Instant::now();
        let outcome = self.client.post(&url).headers(headers).body(body).send().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let entry = match outcome {
            Ok(response) => {
                let status = response.status();
                debug!(integration_id = %integration_id, %url, status = status.as_u16(), duration_ms, "webhook delivered");
                DeliveryLogEntry {
                    event_id: event.id.clone(),
                    topic: event.topic.clone(),
                    http_status: Some(status.as_u16()),
                    duration_ms,
                    error_kind: if status.is_success() { None } else { Some("non2xx".to_string()) },
                }
            }
            Err(e) => {
                warn!(integration_id = %integration_id, %url, error = %e, "webhook delivery failed");
                DeliveryLogEntry {
                    event_id: event.id.clone(),
                    topic: event.topic.clone(),
                    http_status: None,
                    duration_ms,
                    error_kind: Some(if e.is_timeout() { "timeout".to_string() } else { "transport".to_string() }),
                }
            }
        };

        self.registry.record_delivery(&integration_id, entry, self.delivery_log_capacity).await;
    }
}

#[async_trait]
impl WebhookSink for WebhookDeliverer {
    /// Hands the event off to the bounded worker pool and returns
    /// immediately — the bus's per-subscriber dispatch task must not
    /// block on the HTTP round-trip.
    async fn deliver(&self, integration_id: &str, event: &Event) -> Result<()> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        let this = self.clone_for_task();
        let integration_id = integration_id.to_string();
        let event = event.clone();
        tokio::spawn(async move {
            let _permit = permit;
            this.deliver_now(integration_id, event).await;
        });

        Ok(())
    }
}

impl WebhookDeliverer {
    /// Cheap clone of the bits a spawned delivery task needs, since
    /// `Arc<dyn WebhookSink>` doesn't give us back an `Arc<Self>` for
    /// `Arc::clone(self)` inside a `&self` trait method.
    fn clone_for_task(&self) -> Arc<Self> {
        // Re-derived from registry + client + semaphore instead of storing
        // a self-referential Weak: cheap since everything here is an Arc
        // or a handle clone already.
        Arc::new(Self {
            registry: Arc::clone(&self.registry),
            client: self.client.clone(),
            semaphore: Arc::clone(&self.semaphore),
            delivery_log_capacity: self.delivery_log_capacity,
        })
    }
}
