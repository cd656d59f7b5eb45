//! # Integration Hub Domain
//!
//! Plain data types for the Integration Hub's core entities: integration
//! records, events/subscriptions, deintegration records, and port leases.
//! No behavior lives here — see `hub-core` for the components that
//! operate on these types.

pub mod deintegration;
pub mod delivery_log;
pub mod event;
pub mod integration;
pub mod port;

pub use deintegration::{
    CleanupPolicy, DeintegrationRecord, DeintegrationStatus, DeintegrationStep, StateSnapshot,
    StateSnapshotMetadata, StepCheck, StepStatus,
};
pub use delivery_log::DeliveryLogEntry;
pub use event::{Event, SubscriptionOptions, topic_matches};
pub use integration::{
    HealthCheckConfig, IntegrationMetrics, IntegrationRecord, IntegrationStatus, IntegrationType,
};
pub use port::PortLease;
