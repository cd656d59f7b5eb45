use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{info, warn};

use hub_api::Config;
use hub_core::{DeintegrationManager, EventBus, PortAllocator, Registry, WebhookDeliverer, WebhookDelivererConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    if config.development_mode {
        hub_common::init_tracing();
    } else {
        hub_common::init_tracing_json();
    }

    info!("starting Integration Hub API server");
    info!(host = %config.server_host, port = config.server_port, "configuration loaded");

    let port_allocator = Arc::new(PortAllocator::new(config.port_range));
    let event_bus = EventBus::new(config.event_bus_max_history, "integration-hub");
    event_bus.set_default_ttl_ms(config.event_bus_default_ttl_ms).await;

    let registry = Registry::new(port_allocator, Arc::clone(&event_bus), config.registry_config());

    let deliverer = WebhookDeliverer::new(Arc::clone(&registry), WebhookDelivererConfig::default());
    registry.set_webhook_sink(deliverer).await;

    let deintegration = DeintegrationManager::new(
        Arc::clone(&registry),
        Arc::clone(&event_bus),
        PathBuf::from(&config.deintegration_path),
    );
    deintegration.ensure_directory().await?;

    if config.auto_discovery_enabled {
        // No real service manager is wired in yet — it's an external
        // collaborator; an empty static source means the scanner runs
        // and logs but never finds a candidate until one is injected here.
        let service_manager = Arc::new(hub_core::StaticServiceManager::new(Vec::new()));
        let scanner = hub_core::AutoDiscoveryScanner::new(
            Arc::clone(&registry),
            service_manager,
            std::time::Duration::from_millis(config.auto_discovery_scan_interval_ms),
        );
        scanner.spawn();
        info!(interval_ms = config.auto_discovery_scan_interval_ms, "auto-discovery scanner armed");
    }

    let app = hub_api::build_router(Arc::clone(&registry), Arc::clone(&deintegration), config.clone());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Integration Hub API listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Integration Hub API shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            warn!("received terminate signal, shutting down...");
        },
    }
}
