//! Health Prober.
//!
//! One scheduled task per armed integration issues a single HTTP GET per
//! tick and writes the outcome back onto the record through
//! [`Registry::apply_probe_outcome`], which discards stale results for a
//! record that has since moved on (tracked via the generation counter).

use std::sync::Weak;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::catalog::TypeCatalogEntry;
use crate::registry::Registry;

const USER_AGENT: &str = "integration-hub-health-prober/1.0";

/// Derives the probe URL for a record's config: an explicit `healthUrl`
/// override, or the type's `healthPath` joined onto `apiUrl`/`url`.
pub fn probe_url(config: &Value, entry: &TypeCatalogEntry) -> Option<String> {
    if let Some(explicit) = config.get("healthUrl").and_then(|v| v.as_str()) {
        return Some(explicit.to_string());
    }

    let health_path = entry.health_path?;
    let base = config
        .get("apiUrl")
        .or_else(|| config.get("url"))
        .and_then(|v| v.as_str())?;

    let base = base.trim_end_matches('/');
    let path = health_path.trim_start_matches('/');
    Some(format!("{base}/{path}"))
}

fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// A single probe attempt: GET `url`, no body, bounded by `timeout`.
/// Ok(()) iff the response status is 2xx.
pub async fn probe_once(url: &str, timeout: Duration) -> Result<(), String> {
    let response = client(timeout).get(url).send().await.map_err(|e| e.to_string())?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("non-2xx status: {}", response.status()))
    }
}

/// Runs one probe and records its outcome against `id`, guarded by the
/// record's generation at call time.
pub async fn run_probe_and_record(registry: &std::sync::Arc<Registry>, id: &str, url: &str, timeout: Duration) {
    let Some(generation) = registry.current_generation(id).await else {
        return;
    };
    let outcome = probe_once(url, timeout).await;
    registry.apply_probe_outcome(id, generation, outcome).await;
}

/// Spawns the recurring probe task for `id`. The task holds only a `Weak`
/// reference to the registry so it never keeps the registry (and
/// therefore the whole process) alive past a shutdown; it exits quietly
/// once the registry is gone.
pub fn spawn(registry: Weak<Registry>, id: String, entry: TypeCatalogEntry, interval_ms: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Some(registry) = registry.upgrade() else {
                break;
            };

            let Ok(record) = registry.get(&id).await else {
                break;
            };
            if !record.is_live() {
                break;
            }
            let Some(url) = probe_url(&record.config, &entry) else {
                continue;
            };

            debug!(integration_id = %id, %url, "running scheduled health probe");
            run_probe_and_record(&registry, &id, &url, entry.health_timeout).await;
        }
    })
}
