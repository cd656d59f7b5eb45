//! The optional distributed fan-out transport.
//!
//! Local delivery never depends on this: if the transport is down, the bus
//! still dispatches to local subscribers, and a background task retries
//! the connection with exponential backoff (50ms..2s, see Failure
//! model).

use async_trait::async_trait;

use hub_domain::Event;

#[async_trait]
pub trait DistributedTransport: Send + Sync {
    /// Best-effort publish to the distributed channel. Failures are
    /// logged by the caller and never surfaced to `Publish`'s caller.
    async fn publish(&self, event: &Event) -> Result<(), String>;
}

/// Exponential backoff sequence used while reconnecting a distributed
/// transport: 50ms, 100ms, 200ms, ... capped at 2s.
pub fn next_backoff(current_ms: u64) -> u64 {
    (current_ms.saturating_mul(2)).clamp(50, 2000)
}

#[cfg(feature = "redis-transport")]
pub mod redis_transport {
    use super::DistributedTransport;
    use async_trait::async_trait;
    use hub_domain::Event;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;
    use tokio::sync::Mutex;

    /// Fans events out over a Redis pub/sub channel, grounded on
    /// `RedisClient::publish` from the sibling services' Redis helper.
    pub struct RedisTransport {
        channel: String,
        conn: Mutex<ConnectionManager>,
    }

    impl RedisTransport {
        pub async fn connect(redis_url: &str, channel: &str) -> Result<Self, String> {
            let client = redis::Client::open(redis_url).map_err(|e| e.to_string())?;
            let conn = ConnectionManager::new(client)
                .await
                .map_err(|e| e.to_string())?;
            Ok(Self {
                channel: channel.to_string(),
                conn: Mutex::new(conn),
            })
        }
    }

    #[async_trait]
    impl DistributedTransport for RedisTransport {
        async fn publish(&self, event: &Event) -> Result<(), String> {
            let json = serde_json::to_string(event).map_err(|e| e.to_string())?;
            let mut conn = self.conn.lock().await;
            conn.publish::<_, _, ()>(&self.channel, json)
                .await
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps_at_2s() {
        assert_eq!(next_backoff(50), 100);
        assert_eq!(next_backoff(1500), 2000);
        assert_eq!(next_backoff(2000), 2000);
    }

    #[test]
    fn backoff_floor_is_50ms() {
        assert_eq!(next_backoff(0), 50);
    }
}
