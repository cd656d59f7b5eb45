//! The process-wide integration type catalog.
//!
//! A closed table, not open-world polymorphism: every type's defaults and
//! required fields are looked up here rather than dispatched through a
//! trait object, per the "Dynamic dispatch on type" design note.

use std::time::Duration;

use hub_domain::IntegrationType;

/// Per-type catalog entry.
#[derive(Debug, Clone)]
pub struct TypeCatalogEntry {
    pub integration_type: IntegrationType,
    pub default_port: Option<u16>,
    pub health_path: Option<&'static str>,
    pub health_timeout: Duration,
    pub required_fields: &'static [&'static str],
}

/// Look up the catalog entry for a type. The catalog is closed — every
/// variant of `IntegrationType` has exactly one entry here.
pub fn lookup(ty: IntegrationType) -> TypeCatalogEntry {
    match ty {
        IntegrationType::WebUi => TypeCatalogEntry {
            integration_type: ty,
            default_port: Some(3000),
            health_path: Some("/"),
            health_timeout: Duration::from_secs(5),
            required_fields: &["url"],
        },
        IntegrationType::DevelopmentTool => TypeCatalogEntry {
            integration_type: ty,
            default_port: Some(4000),
            health_path: Some("/health"),
            health_timeout: Duration::from_secs(5),
            required_fields: &["url"],
        },
        IntegrationType::ApiService => TypeCatalogEntry {
            integration_type: ty,
            default_port: Some(8000),
            health_path: Some("/health"),
            health_timeout: Duration::from_secs(5),
            required_fields: &["apiUrl"],
        },
        IntegrationType::Database => TypeCatalogEntry {
            integration_type: ty,
            default_port: None,
            health_path: None,
            health_timeout: Duration::from_secs(10),
            required_fields: &["connectionString"],
        },
        IntegrationType::MessageQueue => TypeCatalogEntry {
            integration_type: ty,
            default_port: None,
            health_path: None,
            health_timeout: Duration::from_secs(10),
            required_fields: &["brokerUrl"],
        },
        IntegrationType::Openapi => TypeCatalogEntry {
            integration_type: ty,
            default_port: Some(8100),
            health_path: Some("/health"),
            health_timeout: Duration::from_secs(5),
            required_fields: &["specUrl"],
        },
        IntegrationType::Webhook => TypeCatalogEntry {
            integration_type: ty,
            default_port: None,
            health_path: None,
            health_timeout: Duration::from_secs(5),
            required_fields: &["url"],
        },
        IntegrationType::Plugin => TypeCatalogEntry {
            integration_type: ty,
            default_port: None,
            health_path: None,
            health_timeout: Duration::from_secs(5),
            required_fields: &["source"],
        },
    }
}

/// Default health-check interval used when a record doesn't specify one:
/// derived from the type's health timeout, floored at `fallback_ms` (the
/// process-wide `healthCheck.defaultIntervalMs`).
pub fn default_interval_ms(entry: &TypeCatalogEntry, fallback_ms: u64) -> u64 {
    let from_timeout = entry.health_timeout.as_millis() as u64 * 6;
    from_timeout.max(fallback_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_required_fields() {
        for ty in IntegrationType::ALL {
            let entry = lookup(ty);
            assert!(!entry.required_fields.is_empty());
        }
    }

    #[test]
    fn web_ui_has_default_port_and_health_path() {
        let entry = lookup(IntegrationType::WebUi);
        assert_eq!(entry.default_port, Some(3000));
        assert_eq!(entry.health_path, Some("/"));
    }

    #[test]
    fn database_has_no_port_or_health_path() {
        let entry = lookup(IntegrationType::Database);
        assert_eq!(entry.default_port, None);
        assert_eq!(entry.health_path, None);
    }
}
