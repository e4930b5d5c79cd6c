use std::sync::Arc;

use orgauth_application::PermissionCache;
use orgauth_infrastructure::{InMemoryPermissionCache, RedisPermissionCache};

use crate::api_config::{ApiConfig, StoreBackendConfig};

/// Picks the permission cache for this process.
///
/// The worker and other API replicas mutate a shared Postgres store, so only
/// a cache they can invalidate too (Redis) is allowed there. A process-local
/// cache is used only with the in-memory store, which no other process sees.
pub(super) fn build_permission_cache(
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
) -> Option<Arc<dyn PermissionCache>> {
    let ttl_seconds = config.permission_cache_ttl_seconds;
    if ttl_seconds == 0 {
        tracing::info!("permission cache disabled");
        return None;
    }

    match (redis_client, &config.store_backend) {
        (Some(client), _) => Some(Arc::new(RedisPermissionCache::new(
            client,
            "orgauth:permissions",
            ttl_seconds,
        ))),
        (None, StoreBackendConfig::Memory) => Some(Arc::new(InMemoryPermissionCache::new(ttl_seconds))),
        (None, StoreBackendConfig::Postgres { .. }) => {
            tracing::warn!(
                "permission cache disabled: the postgres store is shared and REDIS_URL is not set"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::api_config::{ApiCommand, ApiConfig};

    use super::build_permission_cache;

    fn config(pairs: &[(&str, &str)]) -> ApiConfig {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(ApiCommand::Serve, |name| values.get(name).cloned())
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn shared_store_without_redis_gets_no_local_cache() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/orgauth")]);
        assert!(build_permission_cache(&config, None).is_none());
    }

    #[test]
    fn shared_store_with_redis_is_cached() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/orgauth"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]);
        let client = redis::Client::open("redis://127.0.0.1:6379");
        assert!(client.is_ok());
        let client = client.unwrap_or_else(|_| unreachable!());

        assert!(build_permission_cache(&config, Some(client)).is_some());
    }

    #[test]
    fn memory_store_keeps_a_local_cache_unless_disabled() {
        let cached = config(&[("STORE_BACKEND", "memory")]);
        assert!(build_permission_cache(&cached, None).is_some());

        let disabled = config(&[
            ("STORE_BACKEND", "memory"),
            ("PERMISSION_CACHE_TTL_SECONDS", "0"),
        ]);
        assert!(build_permission_cache(&disabled, None).is_none());
    }
}
