//! The integration handle capability set.
//!
//! Plugins, database adapters, and webhook handlers all implement the same
//! small surface; methods the concrete handle doesn't need are simply
//! left at their no-op default. This replaces open-world polymorphism
//! with one interface plus optional methods.

use async_trait::async_trait;
use serde_json::Value;

use hub_common::Result;

#[async_trait]
pub trait IntegrationHandle: Send + Sync {
    /// Called once during type-specific initialization.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources. Called by the `immediate`/`graceful` cleanup
    /// step of the deintegration pipeline.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Stop accepting new work, used by the `graceful` cleanup policy
    /// before polling `pending_operations`.
    async fn stop_accepting_operations(&self) -> Result<()> {
        Ok(())
    }

    /// Number of operations still in flight; `graceful` cleanup polls
    /// this until it reaches zero or times out.
    fn pending_operations(&self) -> u32 {
        0
    }

    /// Number of connections currently held open; checked by the
    /// `Validate` step and the `Verify cleanup` step.
    fn active_connections(&self) -> u32 {
        0
    }

    /// Produce a serializable snapshot of this handle's state, for
    /// `preserveData=true` deintegrations. Absent handles are treated
    /// as having no state worth saving.
    async fn save_state(&self) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Restore from a snapshot produced by `save_state`, used during
    /// `Reintegrate`.
    async fn restore_state(&self, _state: &Value) -> Result<()> {
        Ok(())
    }

    /// Execute a named action with arbitrary parameters.
    async fn action(&self, _name: &str, _params: Value) -> Result<Value> {
        Ok(Value::Null)
    }
}

/// A handle with no behavior at all — used for types that declare no
/// extra initialization (`web-ui`, `development-tool`, `api-service`).
pub struct NoopHandle;

#[async_trait]
impl IntegrationHandle for NoopHandle {}
