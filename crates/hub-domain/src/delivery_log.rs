//! Bounded webhook delivery history carried on webhook-type records.
//!
//! The bounding itself (oldest-evicted-first, capped at `deliveryLog`'s
//! configured capacity) is enforced where entries are appended —
//! `Registry::record_delivery` — rather than by a ring type here, since
//! the record's `delivery_log` field round-trips through `serde_json` as
//! a plain `Vec` for the on-disk deintegration snapshot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub event_id: String,
    pub topic: String,
    pub http_status: Option<u16>,
    pub duration_ms: u64,
    pub error_kind: Option<String>,
}
