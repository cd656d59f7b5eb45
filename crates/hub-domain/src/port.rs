//! Port lease data model.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct PortLease {
    pub port: u16,
    pub owner_integration_id: String,
    pub acquired_at: DateTime<Utc>,
}
