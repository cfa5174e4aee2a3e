//! Cache configuration.

use serde::{Deserialize, Serialize};

/// Settings applied when building a [`ReadThroughCache`](crate::ReadThroughCache).
///
/// Deserializable so it can sit inside whatever configuration file the host application loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL in seconds used when a lookup does not supply one. Zero disables expiry.
    pub default_ttl_secs: u64,
    /// Prefix for every store key, joined with `:`.
    pub namespace: Option<String>,
    /// Record hit/miss/persistence counters.
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 0,
            namespace: None,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// The key the store sees for a caller key.
    pub fn store_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(namespace) if !namespace.is_empty() => format!("{}:{}", namespace, key),
            _ => key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_ttl_and_namespace() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl_secs, 0);
        assert_eq!(config.store_key("user:1"), "user:1");
        assert!(config.enable_metrics);
    }

    #[test]
    fn namespace_prefixes_keys() {
        let config = CacheConfig {
            namespace: Some("profiles".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(config.store_key("42"), "profiles:42");
    }

    #[test]
    fn empty_namespace_is_ignored() {
        let config = CacheConfig {
            namespace: Some(String::new()),
            ..CacheConfig::default()
        };
        assert_eq!(config.store_key("42"), "42");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"default_ttl_secs": 60}"#).unwrap();
        assert_eq!(config.default_ttl_secs, 60);
        assert_eq!(config.namespace, None);
        assert!(config.enable_metrics);
    }
}
