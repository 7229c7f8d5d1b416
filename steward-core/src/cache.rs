//! Memoisation shared across one orchestration run.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::{Result, StewardError};

type Slot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// Caches expensive lookups, computed once per key and shared afterwards.
///
/// Concurrent initialisers for the same key collapse onto a single
/// computation; a failed initialiser leaves the slot empty so the next
/// caller tries again. Scope the cache explicitly: the provisioner clears
/// it at the start of each run so memoised values never outlive the
/// invocation they were computed for.
#[derive(Default)]
pub struct InvocationCache {
    entries: DashMap<String, Slot>,
}

impl InvocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, computing it with `init` on first use.
    pub async fn get_or_try_init<T, F, Fut>(&self, key: &str, init: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.entries.entry(key.to_string()).or_default().clone();
        let value = slot
            .get_or_try_init(|| async {
                let computed = init().await?;
                Ok::<Arc<dyn Any + Send + Sync>, StewardError>(Arc::new(computed))
            })
            .await?;
        Arc::clone(value).downcast::<T>().map_err(|_| {
            StewardError::Internal(format!("cache entry '{key}' holds a different type"))
        })
    }

    /// Drops every memoised value, starting a fresh invocation scope.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for InvocationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let cache = Arc::new(InvocationCache::new());
        let initialisations = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let initialisations = Arc::clone(&initialisations);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_init("artifact:crx/app.zip", || async {
                        initialisations.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(42u64)
                    })
                    .await
            }));
        }
        for handle in handles {
            let value = handle.await.expect("join").expect("init");
            assert_eq!(*value, 42);
        }
        assert_eq!(initialisations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_initialiser_leaves_the_slot_retryable() {
        let cache = InvocationCache::new();
        let outcome: Result<Arc<u32>> = cache
            .get_or_try_init("flaky", || async {
                Err(StewardError::Internal("boom".to_string()))
            })
            .await;
        assert!(outcome.is_err());

        let value = cache
            .get_or_try_init("flaky", || async { Ok(7u32) })
            .await
            .expect("second attempt succeeds");
        assert_eq!(*value, 7);
    }

    #[tokio::test]
    async fn mismatched_types_for_one_key_error_out() {
        let cache = InvocationCache::new();
        cache
            .get_or_try_init("key", || async { Ok("text".to_string()) })
            .await
            .expect("seed");
        let retyped: Result<Arc<u32>> = cache.get_or_try_init("key", || async { Ok(1u32) }).await;
        assert!(matches!(retyped, Err(StewardError::Internal(_))));
    }

    #[tokio::test]
    async fn clear_starts_a_fresh_scope() {
        let cache = InvocationCache::new();
        cache
            .get_or_try_init("key", || async { Ok(1u32) })
            .await
            .expect("seed");
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        let value = cache
            .get_or_try_init("key", || async { Ok(2u32) })
            .await
            .expect("recompute");
        assert_eq!(*value, 2);
    }
}
