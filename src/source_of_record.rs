use async_trait::async_trait;

use crate::entry::{EntryMeta, Validity};

/// Where values come from when the cache cannot serve them, together with the rules for
/// judging cached and fresh values.
///
/// An alternative to passing a closure and [`GetOptions`](crate::GetOptions) on every lookup;
/// see [`ReadThroughCache::get_from`](crate::ReadThroughCache::get_from).
#[async_trait]
pub trait SourceOfRecord<Value: Send>: Send + Sync {
    type Error: Send;

    /// The expensive read. Its error is returned to the caller of the lookup as-is.
    async fn retrieve(&self, key: &str) -> Result<Value, Self::Error>;

    /// Judges a cached value that has not outlived its TTL.
    fn validate_cached(&self, _key: &str, _value: &Value, _meta: &EntryMeta) -> Validity {
        Validity::Valid
    }

    /// Judges a freshly retrieved value. `false` prunes the stored entry instead of replacing it.
    fn validate_fresh(&self, _key: &str, _value: &Value) -> bool {
        true
    }

    /// TTL for this source's entries. `None` defers to the cache configuration.
    fn ttl_secs(&self) -> Option<u64> {
        None
    }
}
