//! Core engine of the Integration Hub: the Registry, Event Bus, Port
//! Allocator, Health Prober, Deintegration Manager, Webhook Deliverer, and
//! Auto-Discovery Scanner.

pub mod auto_discovery;
pub mod catalog;
pub mod deintegration;
pub mod event_bus;
pub mod handle;
pub mod health_prober;
pub mod notifier;
pub mod port_allocator;
pub mod registry;
pub mod transport;
pub mod webhook_deliverer;

pub use auto_discovery::{AutoDiscoveryScanner, DiscoveryCandidate, ServiceManager, StaticServiceManager};
pub use deintegration::{DeintegrationManager, DeleteOptions};
pub use event_bus::{EventBus, Handler, HistoryFilter, PublishOptions, SubscribeOptions, Subscription};
pub use handle::{IntegrationHandle, NoopHandle};
pub use notifier::{NoDependents, Notifier};
pub use port_allocator::{PortAllocator, PortRange};
pub use registry::{ListFilter, RegisterOptions, RegisterRequest, Registry, RegistryConfig};
pub use transport::DistributedTransport;
pub use webhook_deliverer::{WebhookDeliverer, WebhookDelivererConfig, WebhookSink};
