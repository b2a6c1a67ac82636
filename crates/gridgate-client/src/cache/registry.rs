//! Process-wide registry of connection entries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::cache::CacheEntry;
use crate::{CacheKey, ClientHandle, Result};

/// Tracing target for registry operations.
const TRACING_TARGET: &str = "gridgate_client::cache";

static GLOBAL_CACHE: OnceLock<ClientCache> = OnceLock::new();

/// Keyed registry of [`CacheEntry`] values.
///
/// Guarantees that for any set of concurrently-requested cache-equivalent
/// targets, exactly one connection factory runs, and every requester shares
/// the single resulting entry. Failed entries are evicted after flushing
/// their waiters so the next request with the same key starts fresh.
///
/// The registry is cheap to clone; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct ClientCache {
    entries: Arc<Mutex<HashMap<CacheKey, Arc<CacheEntry>>>>,
}

impl ClientCache {
    /// Create an independent registry, e.g. for tests or an isolated pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> &'static ClientCache {
        GLOBAL_CACHE.get_or_init(ClientCache::new)
    }

    /// Return the entry for `key`, creating it and starting `factory` when
    /// no entry exists yet.
    ///
    /// On a hit the existing entry's reference count is incremented and
    /// `factory` is never invoked; Pending, Ready, and Failed-not-yet-evicted
    /// entries all count as hits. On a miss a fresh Pending entry is
    /// registered under `key` and `factory` is spawned onto the runtime
    /// exactly once: its success resolves the entry, its failure rejects the
    /// entry and evicts it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_create<F, Fut>(&self, key: CacheKey, factory: F) -> Arc<CacheEntry>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<ClientHandle>> + Send + 'static,
    {
        let entry = {
            let mut entries = self.lock();
            if let Some(existing) = entries.get(&key) {
                existing.acquire();
                tracing::debug!(
                    target: TRACING_TARGET,
                    key = %key,
                    refs = existing.ref_count(),
                    "reusing cached connection entry"
                );
                return existing.clone();
            }

            let entry = Arc::new(CacheEntry::keyed(key.clone()));
            entry.acquire();
            entries.insert(key.clone(), entry.clone());
            entry
        };

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "registered connection entry, starting factory"
        );

        let cache = self.clone();
        let task_entry = entry.clone();
        tokio::spawn(async move {
            match factory().await {
                Ok(handle) => {
                    if let Err(error) = task_entry.resolve(handle) {
                        tracing::error!(
                            target: TRACING_TARGET,
                            key = %key,
                            error = %error,
                            "connection factory resolved an already-terminal entry"
                        );
                    }
                }
                Err(error) => {
                    if let Err(error) = task_entry.reject(error) {
                        tracing::error!(
                            target: TRACING_TARGET,
                            key = %key,
                            error = %error,
                            "connection factory rejected an already-terminal entry"
                        );
                    }
                    cache.evict(&key, &task_entry);
                }
            }
        });

        entry
    }

    /// Remove `entry` from the registry, but only while it is still the
    /// current entry under `key`.
    ///
    /// The guard matters under concurrency: by the time a failed entry's
    /// task gets here, a fresh entry may already occupy the key, and that
    /// newcomer must survive. Returns whether an eviction happened.
    pub fn evict(&self, key: &CacheKey, entry: &Arc<CacheEntry>) -> bool {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(key);
                tracing::debug!(
                    target: TRACING_TARGET,
                    key = %key,
                    "evicted failed connection entry"
                );
                true
            }
            _ => false,
        }
    }

    /// Whether the registry currently holds an entry for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<CacheEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
