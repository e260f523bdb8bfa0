use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::Result;
use crate::vault::{ClientCredentials, SecretSource};

/// Entry stored in the local DashMap with an expiry timestamp.
#[derive(Clone)]
struct CacheEntry {
    value: ClientCredentials,
    expires_at: Instant,
}

/// TTL-bounded cache in front of a [`SecretSource`], keyed by mall id.
///
/// Owned by whoever runs refresh cycles and passed in explicitly; there is no
/// process-global secret state. Entries are checked on read and evicted lazily.
#[derive(Clone)]
pub struct SecretCache {
    source: Arc<dyn SecretSource>,
    ttl: Duration,
    local: Arc<DashMap<String, CacheEntry>>,
}

impl SecretCache {
    pub fn new(source: Arc<dyn SecretSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            local: Arc::new(DashMap::new()),
        }
    }

    pub async fn get(&self, tenant_id: &str) -> Result<ClientCredentials> {
        if let Some(entry) = self.local.get(tenant_id) {
            if Instant::now() < entry.expires_at {
                return Ok(entry.value.clone());
            }
            // expired — drop the ref before removing
            drop(entry);
            self.local.remove(tenant_id);
        }

        let value = self.source.fetch(tenant_id).await?;
        if !self.ttl.is_zero() {
            self.local.insert(
                tenant_id.to_string(),
                CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        Ok(value)
    }

    /// Forget the mall's credentials so the next `get` hits the source.
    pub fn invalidate(&self, tenant_id: &str) {
        if self.local.remove(tenant_id).is_some() {
            tracing::debug!(tenant_id, "invalidated cached client credentials");
        }
    }

    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecretSource for CountingSource {
        async fn fetch(&self, tenant_id: &str) -> Result<ClientCredentials> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if tenant_id == "missing" {
                return Err(Error::Config("no secret".into()));
            }
            Ok(ClientCredentials {
                client_id: format!("{}-id", tenant_id),
                client_secret: format!("secret-{}", n),
            })
        }
    }

    #[test]
    fn test_hit_within_ttl_does_not_refetch() {
        let source = Arc::new(CountingSource::default());
        let cache = SecretCache::new(source.clone(), Duration::from_secs(300));

        let first = tokio_test::block_on(cache.get("shop1")).unwrap();
        let second = tokio_test::block_on(cache.get("shop1")).unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_always_refetches() {
        let source = Arc::new(CountingSource::default());
        let cache = SecretCache::new(source.clone(), Duration::ZERO);

        tokio_test::block_on(cache.get("shop1")).unwrap();
        tokio_test::block_on(cache.get("shop1")).unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let source = Arc::new(CountingSource::default());
        let cache = SecretCache::new(source.clone(), Duration::from_secs(300));

        let first = tokio_test::block_on(cache.get("shop1")).unwrap();
        cache.invalidate("shop1");
        let second = tokio_test::block_on(cache.get("shop1")).unwrap();

        assert_ne!(first.client_secret, second.client_secret);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let source = Arc::new(CountingSource::default());
        let cache = SecretCache::new(source.clone(), Duration::from_secs(300));

        assert!(tokio_test::block_on(cache.get("missing")).is_err());
        assert!(tokio_test::block_on(cache.get("missing")).is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_expired_entry_is_replaced_on_read() {
        let source = Arc::new(CountingSource::default());
        let cache = SecretCache::new(source.clone(), Duration::from_millis(1));

        let first = tokio_test::block_on(cache.get("shop1")).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let second = tokio_test::block_on(cache.get("shop1")).unwrap();

        assert_ne!(first.client_secret, second.client_secret);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }
}
