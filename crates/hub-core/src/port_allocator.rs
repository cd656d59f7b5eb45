//! Port Allocator.
//!
//! Hands out currently-unbound TCP ports in a configured range. Allocation
//! is advisory: a bind-and-close probe, not a long-term OS reservation.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use hub_common::{Error, Result};
use hub_domain::PortLease;

#[derive(Debug, Clone, Copy)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self { min: 3000, max: 9999 }
    }
}

/// Process-wide port allocator. The lease set prevents two concurrent
/// registrations from racing for the same port when each would
/// independently pass a bind test; the bind test itself catches
/// collisions with processes the allocator doesn't know about.
pub struct PortAllocator {
    range: PortRange,
    leases: Mutex<HashMap<u16, PortLease>>,
}

impl PortAllocator {
    pub fn new(range: PortRange) -> Self {
        Self {
            range,
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Probe ports sequentially starting at `start_port` and lease the
    /// first one that is (a) not leased in-process and (b) bindable on
    /// `0.0.0.0`, atomically: the lock is held across both the scan and
    /// the insert, so two concurrent callers can never observe and lease
    /// the same port.
    pub async fn find_and_acquire(&self, start_port: u16, max_attempts: u32, owner_integration_id: &str) -> Result<u16> {
        let mut leases = self.leases.lock().await;

        let mut port = start_port;
        for _ in 0..max_attempts {
            if port > self.range.max {
                break;
            }
            if port >= self.range.min && !leases.contains_key(&port) && Self::is_bindable(port).await {
                leases.insert(
                    port,
                    PortLease {
                        port,
                        owner_integration_id: owner_integration_id.to_string(),
                        acquired_at: Utc::now(),
                    },
                );
                debug!(port, owner_integration_id, "port leased");
                return Ok(port);
            }
            port = port.saturating_add(1);
        }

        Err(Error::PortExhausted(format!(
            "no free port found starting at {start_port} within {max_attempts} attempts (range {}-{})",
            self.range.min, self.range.max
        )))
    }

    /// Release a previously-acquired port back to the pool.
    pub async fn release(&self, port: u16) {
        let mut leases = self.leases.lock().await;
        if leases.remove(&port).is_some() {
            debug!(port, "port released");
        }
    }

    /// Current leases, for diagnostics.
    pub async fn leases(&self) -> Vec<PortLease> {
        self.leases.lock().await.values().cloned().collect()
    }

    async fn is_bindable(port: u16) -> bool {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                drop(listener);
                true
            }
            Err(e) => {
                warn!(port, error = %e, "port not bindable");
                false
            }
        }
    }
}
