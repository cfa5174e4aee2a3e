use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::codec::{BincodeCodec, EntryCodec, JsonCodec};
use crate::config::CacheConfig;
use crate::entry::{EntryMeta, Validity};
use crate::hydration::pull::PullHydrator;
use crate::hydration::CacheLookupSuccess;
use crate::metrics::{CacheMetrics, CacheStats};
use crate::source_of_record::SourceOfRecord;
use crate::store::KeyValueStore;

type CachedValidator<Value> = Box<dyn Fn(&Value, &EntryMeta) -> Validity + Send + Sync>;
type FreshValidator<Value> = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Per-lookup rules. Anything left unset falls back to: the cache's default TTL, every cached
/// value `Valid`, every fresh value worth saving.
pub struct GetOptions<Value> {
    ttl_secs: Option<u64>,
    validate_cached: Option<CachedValidator<Value>>,
    validate_fresh: Option<FreshValidator<Value>>,
}

impl<Value> Default for GetOptions<Value> {
    fn default() -> Self {
        GetOptions {
            ttl_secs: None,
            validate_cached: None,
            validate_fresh: None,
        }
    }
}

impl<Value> GetOptions<Value> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds after the last persisted refresh at which an entry is refreshed regardless of
    /// the cached-data validator. Zero disables expiry.
    pub fn ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Judges cached data that has not expired.
    pub fn validate_cached(
        mut self,
        validator: impl Fn(&Value, &EntryMeta) -> Validity + Send + Sync + 'static,
    ) -> Self {
        self.validate_cached = Some(Box::new(validator));
        self
    }

    /// Judges freshly read data; `false` prunes the stored entry instead of replacing it.
    pub fn validate_fresh(mut self, validator: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validate_fresh = Some(Box::new(validator));
        self
    }
}

/// Read-through cache over a [`KeyValueStore`].
///
/// Lookups never fail because of the store. A store that errors, lacks the key, or holds bytes
/// that do not decode simply causes a refresh. The only error a lookup returns is the one the
/// caller's read operation fails with.
///
/// Writes and deletes that follow a refresh run on detached Tokio tasks and are not awaited by
/// the lookup; [`drain`](Self::drain) waits for them.
pub struct ReadThroughCache<Codec = JsonCodec> {
    hydrator: PullHydrator<Codec>,
    config: CacheConfig,
}

pub type JsonReadThroughCache = ReadThroughCache<JsonCodec>;
pub type BincodeReadThroughCache = ReadThroughCache<BincodeCodec>;

impl ReadThroughCache<JsonCodec> {
    /// JSON-encoded cache with default configuration and the system clock.
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: impl KeyValueStore + 'static) -> ReadThroughCacheBuilder<JsonCodec> {
        ReadThroughCacheBuilder::new(store)
    }
}

impl<Codec: EntryCodec> ReadThroughCache<Codec> {
    /// Returns the value for `key`, from the store when possible and from `read` otherwise,
    /// using the default TTL and validators.
    pub async fn get<Value, Error, Read, Fut>(&self, key: &str, read: Read) -> Result<Value, Error>
    where
        Value: Serialize + DeserializeOwned,
        Read: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>>,
    {
        self.get_with(key, read, GetOptions::new()).await
    }

    /// Like [`get`](Self::get), with per-lookup TTL and validators.
    pub async fn get_with<Value, Error, Read, Fut>(
        &self,
        key: &str,
        read: Read,
        options: GetOptions<Value>,
    ) -> Result<Value, Error>
    where
        Value: Serialize + DeserializeOwned,
        Read: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>>,
    {
        self.get_with_status(key, read, options)
            .await
            .map(CacheLookupSuccess::into_inner)
    }

    /// Like [`get_with`](Self::get_with), reporting whether the value was a hit, a miss, a
    /// persisted refresh or an unstable refresh.
    pub async fn get_with_status<Value, Error, Read, Fut>(
        &self,
        key: &str,
        read: Read,
        options: GetOptions<Value>,
    ) -> Result<CacheLookupSuccess<Value>, Error>
    where
        Value: Serialize + DeserializeOwned,
        Read: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>>,
    {
        let store_key = self.config.store_key(key);
        let ttl_secs = options.ttl_secs.unwrap_or(self.config.default_ttl_secs);
        let GetOptions {
            validate_cached,
            validate_fresh,
            ..
        } = options;

        self.hydrator
            .lookup(
                &store_key,
                ttl_secs,
                |value: &Value, meta: &EntryMeta| match &validate_cached {
                    Some(validator) => validator(value, meta),
                    None => Validity::Valid,
                },
                read,
                |value: &Value| match &validate_fresh {
                    Some(validator) => validator(value),
                    None => true,
                },
            )
            .await
    }

    /// Looks `key` up with the read operation and validation rules of `source`.
    pub async fn get_from<Value, Source>(
        &self,
        key: &str,
        source: &Source,
    ) -> Result<Value, Source::Error>
    where
        Value: Serialize + DeserializeOwned + Send,
        Source: SourceOfRecord<Value> + ?Sized,
    {
        let store_key = self.config.store_key(key);
        let ttl_secs = source
            .ttl_secs()
            .unwrap_or(self.config.default_ttl_secs);

        self.hydrator
            .lookup(
                &store_key,
                ttl_secs,
                |value: &Value, meta: &EntryMeta| source.validate_cached(key, value, meta),
                || source.retrieve(key),
                |value: &Value| source.validate_fresh(key, value),
            )
            .await
            .map(CacheLookupSuccess::into_inner)
    }

    /// Waits for every store write and delete dispatched so far. Meant for shutdown and tests;
    /// lookups never need it.
    pub async fn drain(&self) {
        self.hydrator.drain().await;
    }

    /// Counters since the cache was built. All zero when metrics are disabled.
    pub fn stats(&self) -> CacheStats {
        self.hydrator
            .metrics()
            .map(|metrics| metrics.snapshot())
            .unwrap_or_default()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

/// Builds a [`ReadThroughCache`].
pub struct ReadThroughCacheBuilder<Codec = JsonCodec> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    codec: std::marker::PhantomData<fn() -> Codec>,
}

impl ReadThroughCacheBuilder<JsonCodec> {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        ReadThroughCacheBuilder {
            store: Arc::new(store),
            clock: Arc::new(SystemClock),
            config: CacheConfig::default(),
            codec: std::marker::PhantomData,
        }
    }
}

impl<Codec: EntryCodec> ReadThroughCacheBuilder<Codec> {
    /// Switches the wire format of stored entries.
    pub fn codec<Other: EntryCodec>(self) -> ReadThroughCacheBuilder<Other> {
        ReadThroughCacheBuilder {
            store: self.store,
            clock: self.clock,
            config: self.config,
            codec: std::marker::PhantomData,
        }
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn default_ttl(mut self, ttl_secs: u64) -> Self {
        self.config.default_ttl_secs = ttl_secs;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    pub fn build(self) -> ReadThroughCache<Codec> {
        let metrics = self
            .config
            .enable_metrics
            .then(|| Arc::new(CacheMetrics::new()));

        ReadThroughCache {
            hydrator: PullHydrator::new(self.store, self.clock, metrics),
            config: self.config,
        }
    }
}
