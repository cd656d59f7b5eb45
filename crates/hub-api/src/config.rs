//! Process configuration, loaded from environment variables.

use hub_common::{Result, env};
use hub_core::{PortRange, RegistryConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    pub port_range: PortRange,
    pub port_probe_attempts: u32,

    pub event_bus_max_history: usize,
    pub event_bus_default_ttl_ms: Option<u64>,

    pub deintegration_path: String,

    pub auto_discovery_enabled: bool,
    pub auto_discovery_scan_interval_ms: u64,

    pub health_check_default_interval_ms: u64,
    pub health_check_default_timeout_ms: u64,

    pub development_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let ttl_ms: u64 = env::parse_or("EVENT_BUS_DEFAULT_TTL_MS", 0)?;

        Ok(Self {
            server_host: env::or_default("HUB_API_HOST", "0.0.0.0"),
            server_port: env::parse_or("HUB_API_PORT", 8088)?,

            port_range: PortRange {
                min: env::parse_or("PORT_RANGE_MIN", 3000)?,
                max: env::parse_or("PORT_RANGE_MAX", 9999)?,
            },
            port_probe_attempts: env::parse_or("PORT_PROBE_ATTEMPTS", 100)?,

            event_bus_max_history: env::parse_or("EVENT_BUS_MAX_HISTORY", 1000)?,
            event_bus_default_ttl_ms: if ttl_ms == 0 { None } else { Some(ttl_ms) },

            deintegration_path: env::or_default("DEINTEGRATION_PATH", "./data/deintegrations"),

            auto_discovery_enabled: env::parse_or("AUTO_DISCOVERY_ENABLED", false)?,
            auto_discovery_scan_interval_ms: env::parse_or("AUTO_DISCOVERY_SCAN_INTERVAL_MS", 5 * 60 * 1000)?,

            health_check_default_interval_ms: env::parse_or("HEALTH_CHECK_DEFAULT_INTERVAL_MS", 30_000)?,
            health_check_default_timeout_ms: env::parse_or("HEALTH_CHECK_DEFAULT_TIMEOUT_MS", 5_000)?,

            development_mode: env::parse_or("DEVELOPMENT_MODE", false)?,
        })
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            development_mode: self.development_mode,
            default_health_interval_ms: self.health_check_default_interval_ms,
            default_health_timeout_ms: self.health_check_default_timeout_ms,
            port_probe_attempts: self.port_probe_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        // SAFETY: test-only, no other test in this crate reads these keys.
        unsafe {
            std::env::remove_var("HUB_API_PORT");
            std::env::remove_var("PORT_RANGE_MIN");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.server_port, 8088);
        assert_eq!(config.port_range.min, 3000);
        assert_eq!(config.port_range.max, 9999);
        assert_eq!(config.event_bus_default_ttl_ms, None);
    }
}
