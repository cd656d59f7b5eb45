//! The "notify dependents" collaborator.
//!
//! Abstract because the real dependency graph lives outside this crate's
//! scope; the deintegration manager only needs something it can call.

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notify `dependent_id` that an integration is going away. Individual
    /// failures are caught by the caller and recorded per-dependent; they
    /// never abort the deintegration pipeline.
    async fn notify(&self, dependent_id: &str, notice: &Value) -> Result<(), String>;
}

/// A notifier with no dependents to tell — the default when the caller
/// doesn't wire in a real dependency graph.
pub struct NoDependents;

#[async_trait]
impl Notifier for NoDependents {
    async fn notify(&self, _dependent_id: &str, _notice: &Value) -> Result<(), String> {
        Ok(())
    }
}
