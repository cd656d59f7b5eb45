//! Event bus data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An immutable event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub topic: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub ttl_ms: Option<u64>,
    pub metadata: Option<HashMap<String, String>>,
}

impl Event {
    /// Whether this event's TTL has elapsed, measured from `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_ms {
            Some(ttl) => {
                let age_ms = (now - self.timestamp).num_milliseconds();
                age_ms >= 0 && age_ms as u64 >= ttl
            }
            None => false,
        }
    }
}

/// Per-subscription delivery options.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionOptions {
    pub retries: u32,
    pub retry_delay_ms: u64,
}

/// Matches a dotted topic pattern against a dotted topic, per the trailing
/// wildcard rule:
///
/// `P == T`, or `P` ends in a trailing `*` segment and the non-wildcard
/// prefix of `P` matches the same-length prefix of `T`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let p: Vec<&str> = pattern.split('.').collect();
    let t: Vec<&str> = topic.split('.').collect();

    if p == t {
        return true;
    }

    if let Some((last, prefix)) = p.split_last() {
        if *last == "*" && prefix.len() <= t.len() {
            return prefix == &t[..prefix.len()];
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(topic_matches("integration.registered", "integration.registered"));
        assert!(!topic_matches("integration.registered", "integration.removed"));
    }

    #[test]
    fn trailing_wildcard_matches_one_or_more_segments() {
        assert!(topic_matches("integration.*", "integration.registered"));
        assert!(topic_matches("integration.*", "integration.alpha.request"));
        assert!(!topic_matches("integration.*", "unrelated.topic"));
    }

    #[test]
    fn wildcard_requires_prefix_match() {
        assert!(!topic_matches("a.b.*", "a.c.d"));
        assert!(topic_matches("a.b.*", "a.b.c.d"));
    }

    #[test]
    fn bare_star_matches_everything() {
        assert!(topic_matches("*", "anything.at.all"));
    }
}
