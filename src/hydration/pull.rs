use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use crate::clock::Clock;
use crate::codec::EntryCodec;
use crate::entry::{CacheEntry, EntryMeta, Validity};
use crate::hydration::{CacheLookupSuccess, RefreshMode, StoreResult};
use crate::metrics::CacheMetrics;
use crate::store::KeyValueStore;

/// Store mutation dispatched after a refresh.
enum Persistence {
    Write(Vec<u8>),
    Prune,
}

/// Pulls values from the caller's read operation whenever the store cannot serve them.
///
/// Holds no per-key state. Concurrent lookups of one key each refresh on their own and the
/// last store write wins.
pub(crate) struct PullHydrator<Codec> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<CacheMetrics>>,
    pending: TaskTracker,
    codec: PhantomData<fn() -> Codec>,
}

impl<Codec: EntryCodec> PullHydrator<Codec> {
    pub(crate) fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        metrics: Option<Arc<CacheMetrics>>,
    ) -> Self {
        PullHydrator {
            store,
            clock,
            metrics,
            pending: TaskTracker::new(),
            codec: PhantomData,
        }
    }

    pub(crate) fn metrics(&self) -> Option<&Arc<CacheMetrics>> {
        self.metrics.as_ref()
    }

    /// Serves `key` from the store when possible, otherwise refreshes it through `read`.
    ///
    /// The only error returned is the one `read` fails with.
    pub(crate) async fn lookup<Value, Error, Read, Fut, CachedValidator, FreshValidator>(
        &self,
        key: &str,
        ttl_secs: u64,
        validate_cached: CachedValidator,
        read: Read,
        validate_fresh: FreshValidator,
    ) -> Result<CacheLookupSuccess<Value>, Error>
    where
        Value: Serialize + DeserializeOwned,
        Read: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>>,
        CachedValidator: FnOnce(&Value, &EntryMeta) -> Validity,
        FreshValidator: FnOnce(&Value) -> bool,
    {
        let now = self.clock.now_secs();

        let store_result = match self.read_entry::<Value>(key).await {
            None => StoreResult::NotFound,
            Some(entry) if entry.meta.is_expired(ttl_secs, now) => {
                tracing::debug!(key, age = entry.meta.age(now), ttl_secs, "Cache entry expired");
                self.record(CacheMetrics::record_expired);
                StoreResult::Expired(entry.meta)
            }
            Some(entry) => match validate_cached(&entry.data, &entry.meta) {
                Validity::Valid => {
                    tracing::debug!(key, "Cache hit");
                    self.record(CacheMetrics::record_hit);
                    return Ok(CacheLookupSuccess::Hit(entry.data));
                }
                Validity::Invalid => {
                    tracing::debug!(key, "Cached data rejected by validator");
                    self.record(CacheMetrics::record_invalidated);
                    StoreResult::Invalid(entry.meta)
                }
                Validity::Unstable => {
                    tracing::debug!(key, "Cached data unstable, refreshing without saving");
                    self.record(CacheMetrics::record_unstable);
                    StoreResult::Unstable(entry.meta)
                }
            },
        };

        let mode = store_result.refresh_mode();
        let fresh = self.refresh(key, read, validate_fresh, mode, now).await?;
        Ok(CacheLookupSuccess::refreshed(store_result, fresh))
    }

    /// Runs `read` and decides what the store should keep afterwards.
    ///
    /// Store mutations are detached; neither their latency nor their failure reaches the caller.
    pub(crate) async fn refresh<Value, Error, Read, Fut, FreshValidator>(
        &self,
        key: &str,
        read: Read,
        validate_fresh: FreshValidator,
        mode: RefreshMode,
        now: i64,
    ) -> Result<Value, Error>
    where
        Value: Serialize,
        Read: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>>,
        FreshValidator: FnOnce(&Value) -> bool,
    {
        let fresh = read().await?;

        if mode.skip_saving {
            return Ok(fresh);
        }

        if validate_fresh(&fresh) {
            let meta = EntryMeta::refreshed(mode.baseline.as_ref(), now);
            match Codec::encode(&CacheEntry::new(&fresh, meta)) {
                Ok(bytes) => self.dispatch(key, Persistence::Write(bytes)),
                Err(e) => {
                    tracing::warn!(key, codec = Codec::NAME, error = %e, "Failed to encode cache entry");
                    self.record(CacheMetrics::record_persist_failure);
                }
            }
        } else {
            tracing::debug!(key, "Fresh data rejected by validator, pruning cache entry");
            self.dispatch(key, Persistence::Prune);
        }

        Ok(fresh)
    }

    /// Waits for every store mutation dispatched so far.
    pub(crate) async fn drain(&self) {
        self.pending.close();
        self.pending.wait().await;
        self.pending.reopen();
    }

    async fn read_entry<Value: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<Value>> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key, "Cache miss");
                self.record(CacheMetrics::record_miss);
                return None;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Store read failed, treating as miss");
                self.record(CacheMetrics::record_store_error);
                return None;
            }
        };

        match Codec::decode(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key, codec = Codec::NAME, error = %e, "Undecodable cache entry, treating as miss");
                self.record(CacheMetrics::record_decode_error);
                None
            }
        }
    }

    /// Detach and forget: the mutation runs on its own task and is not cancelled with the caller.
    fn dispatch(&self, key: &str, persistence: Persistence) {
        let store = Arc::clone(&self.store);
        let metrics = self.metrics.clone();
        let store_key = key.to_string();

        let task = async move {
            let pruning = matches!(persistence, Persistence::Prune);
            let result = match persistence {
                Persistence::Write(bytes) => store.set(&store_key, bytes).await,
                Persistence::Prune => store.delete(&store_key).await,
            };

            match (result, &metrics) {
                (Ok(()), Some(metrics)) if pruning => metrics.record_pruned(),
                (Ok(()), Some(metrics)) => metrics.record_persisted(),
                (Ok(()), None) => {}
                (Err(e), metrics) => {
                    let action = if pruning { "prune" } else { "write" };
                    tracing::warn!(key = %store_key, action, error = %e, "Cache persistence failed");
                    if let Some(metrics) = metrics {
                        metrics.record_persist_failure();
                    }
                }
            }
        };

        match Handle::try_current() {
            Ok(handle) => {
                self.pending.spawn_on(task, &handle);
            }
            Err(_) => {
                tracing::warn!(key, "No Tokio runtime to persist on, leaving store untouched");
                self.record(CacheMetrics::record_persist_failure);
            }
        }
    }

    fn record(&self, event: fn(&CacheMetrics)) {
        if let Some(metrics) = &self.metrics {
            event(metrics);
        }
    }
}
