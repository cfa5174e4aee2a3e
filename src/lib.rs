//! # cache_browns
//!
//! A read-through cache that sits between a caller and an expensive data-producing operation,
//! backed by a (usually remote) key-value store.
//!
//! Every lookup decides whether the stored value can be served as-is, must be refreshed, or must
//! be refreshed without persisting the result. The decision combines a TTL computed from the
//! entry's own metadata with two caller-supplied validators: one for cached data
//! ([`Validity`]) and one for freshly produced data (`bool`).
//!
//! Store trouble is never surfaced: transport errors, misses and undecodable entries all
//! degrade to a refresh. The only error `get` returns is the one raised by the caller's own read
//! operation.
//!
//! ```ignore
//! use cache_browns::{GetOptions, ReadThroughCache, Validity, store::memory::MemoryStore};
//!
//! let cache = ReadThroughCache::new(MemoryStore::new());
//!
//! let user = cache
//!     .get_with(
//!         "user:42",
//!         || async { load_user(42).await },
//!         GetOptions::new()
//!             .ttl(60)
//!             .validate_cached(|user: &User, _meta| {
//!                 if user.confirmed { Validity::Valid } else { Validity::Unstable }
//!             }),
//!     )
//!     .await?;
//! ```

pub mod clock;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod hydration;
pub mod managed_cache;
pub mod metrics;
pub mod source_of_record;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{BincodeCodec, EntryCodec, JsonCodec};
pub use config::CacheConfig;
pub use entry::{CacheEntry, EntryMeta, Validity};
pub use error::{CodecError, StoreError};
pub use hydration::CacheLookupSuccess;
pub use managed_cache::{
    BincodeReadThroughCache, GetOptions, JsonReadThroughCache, ReadThroughCache,
    ReadThroughCacheBuilder,
};
pub use metrics::{CacheMetrics, CacheStats};
pub use source_of_record::SourceOfRecord;
pub use store::KeyValueStore;
