use serde::{Deserialize, Serialize};

/// Persistence timestamps of a cache entry, in seconds since the Unix epoch.
///
/// `created` is set once, the first time an entry for the key is persisted without a prior
/// baseline, and is carried across later refreshes. `updated` moves on every persisted refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryMeta {
    pub created: i64,
    pub updated: i64,
}

impl EntryMeta {
    /// Metadata for a write at `now`, keeping `created` from `baseline` when there is one.
    pub fn refreshed(baseline: Option<&EntryMeta>, now: i64) -> Self {
        let created = baseline.map_or(now, |meta| meta.created);
        EntryMeta {
            created: created.min(now),
            updated: now,
        }
    }

    /// True when `ttl_secs` is non-zero and `updated + ttl_secs` lies strictly before `now`.
    ///
    /// An entry exactly `ttl_secs` old has not expired yet; it expires one second later.
    pub fn is_expired(&self, ttl_secs: u64, now: i64) -> bool {
        if ttl_secs == 0 {
            return false;
        }

        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        self.updated.saturating_add(ttl) < now
    }

    /// Seconds since the last persisted refresh.
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.updated)
    }
}

/// The unit of storage: caller payload plus persistence metadata.
///
/// On the wire this is exactly `{"data": ..., "meta": {"created": N, "updated": N}}`; anything
/// else fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheEntry<Value> {
    pub data: Value,
    pub meta: EntryMeta,
}

impl<Value> CacheEntry<Value> {
    pub fn new(data: Value, meta: EntryMeta) -> Self {
        CacheEntry { data, meta }
    }
}

/// Verdict of a cached-data validator on an entry that has not expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Serve the cached data as-is.
    Valid,

    /// Refresh, and replace (or prune) the stored entry based on the fresh data.
    Invalid,

    /// Refresh and serve the fresh data for this call only. The stored entry is left untouched.
    Unstable,
}
