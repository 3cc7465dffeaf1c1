//! Fingerprint-keyed result cache with single-flight computation.

pub mod fingerprint;

pub use fingerprint::fingerprint;

use dashmap::DashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use surface_api::Language;
use tokio::sync::Mutex;

pub type CacheKey = (PathBuf, Language);

struct Entry<V> {
    fingerprint: String,
    value: V,
}

type Slot<V> = Arc<Mutex<Option<Entry<V>>>>;

/// Memoizes one value per key, valid for exactly one fingerprint.
///
/// Each key owns an async mutex. Concurrent callers for the same key queue on
/// it: the first computes, the rest find the stored entry. Distinct keys never
/// contend. Failed computations store nothing, so the next caller retries.
pub struct ResultCache<V> {
    slots: DashMap<CacheKey, Slot<V>>,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<V: Clone> ResultCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: CacheKey,
        fingerprint: &str,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slots.entry(key.clone()).or_default().clone();
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref()
            && entry.fingerprint == fingerprint
        {
            tracing::debug!(path = %key.0.display(), language = %key.1, "result cache hit");
            return Ok(entry.value.clone());
        }

        tracing::debug!(path = %key.0.display(), language = %key.1, fingerprint, "result cache miss");
        let value = compute().await?;
        *guard = Some(Entry {
            fingerprint: fingerprint.to_string(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// The stored value, if its fingerprint still matches.
    pub async fn get(&self, key: &CacheKey, fingerprint: &str) -> Option<V> {
        let slot = self.slots.get(key)?.clone();
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|e| e.fingerprint == fingerprint)
            .map(|e| e.value.clone())
    }

    pub fn invalidate(&self, key: &CacheKey) {
        self.slots.remove(key);
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of keys with a slot, computed or in flight.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(p: &str) -> CacheKey {
        (PathBuf::from(p), Language::GO)
    }

    #[tokio::test]
    async fn test_hit_and_invalidation_by_fingerprint() {
        let cache: ResultCache<Arc<String>> = ResultCache::new();
        let runs = AtomicUsize::new(0);
        let compute = |v: &'static str| {
            runs.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ()>(Arc::new(v.to_string())) }
        };

        let a = cache.get_or_compute(key("/p"), "f1", || compute("one")).await.unwrap();
        let b = cache.get_or_compute(key("/p"), "f1", || compute("two")).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let c = cache.get_or_compute(key("/p"), "f2", || compute("three")).await.unwrap();
        assert_eq!(*c, "three");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(cache.get(&key("/p"), "f1").await.is_none());
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let cache: ResultCache<u32> = ResultCache::new();
        let err = cache
            .get_or_compute(key("/p"), "f", || async { Err::<u32, &str>("boom") })
            .await;
        assert!(err.is_err());
        let ok = cache
            .get_or_compute(key("/p"), "f", || async { Ok::<u32, &str>(7) })
            .await;
        assert_eq!(ok, Ok(7));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight() {
        let cache: Arc<ResultCache<Arc<u32>>> = Arc::new(ResultCache::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key("/same"), "f", || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ()>(Arc::new(42))
                    })
                    .await
                    .unwrap()
            }));
        }

        let results: Vec<Arc<u32>> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[tokio::test]
    async fn test_clear_and_len() {
        let cache: ResultCache<u8> = ResultCache::new();
        cache.get_or_compute(key("/a"), "f", || async { Ok::<_, ()>(1) }).await.unwrap();
        cache.get_or_compute(key("/b"), "f", || async { Ok::<_, ()>(2) }).await.unwrap();
        assert_eq!(cache.len(), 2);
        cache.invalidate(&key("/a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
