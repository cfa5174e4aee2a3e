pub(crate) mod pull;

use crate::entry::EntryMeta;

/// How a lookup produced its value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CacheLookupSuccess<Value> {
    /// No usable entry (absent, unreadable store, or undecodable bytes); fetched from the read
    /// operation.
    Miss(Value),

    /// Entry was expired or judged `Invalid`, and was refreshed from the read operation.
    Refresh(Value),

    /// Entry was judged `Unstable`; fresh value returned, stored entry left untouched.
    Unstable(Value),

    /// Valid value found in the store.
    Hit(Value),
}

impl<Value> CacheLookupSuccess<Value> {
    /// Labels a value produced by a refresh with the reason the refresh happened.
    pub fn refreshed(store_result: StoreResult, value: Value) -> Self {
        match store_result {
            StoreResult::NotFound => CacheLookupSuccess::Miss(value),
            StoreResult::Expired(_) | StoreResult::Invalid(_) => CacheLookupSuccess::Refresh(value),
            StoreResult::Unstable(_) => CacheLookupSuccess::Unstable(value),
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            CacheLookupSuccess::Miss(value)
            | CacheLookupSuccess::Refresh(value)
            | CacheLookupSuccess::Unstable(value)
            | CacheLookupSuccess::Hit(value) => value,
        }
    }

    pub fn into_inner(self) -> Value {
        match self {
            CacheLookupSuccess::Miss(value)
            | CacheLookupSuccess::Refresh(value)
            | CacheLookupSuccess::Unstable(value)
            | CacheLookupSuccess::Hit(value) => value,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookupSuccess::Hit(_))
    }
}

/// Why a lookup could not serve the stored entry for a key.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreResult {
    /// Store unreadable, key absent, or bytes undecodable.
    NotFound,

    /// Entry outlived its TTL. The cached-data validator was not consulted.
    Expired(EntryMeta),

    /// Validator rejected the entry.
    Invalid(EntryMeta),

    /// Validator asked for a one-off refresh that must not touch the store.
    Unstable(EntryMeta),
}

/// How a refresh treats the store once fresh data is in hand.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RefreshMode {
    /// Metadata of the entry being replaced, if any. Supplies `created` for the next write.
    pub baseline: Option<EntryMeta>,
    /// Leave the store untouched, whatever the freshness validator says.
    pub skip_saving: bool,
}

impl StoreResult {
    /// The refresh this result calls for.
    pub fn refresh_mode(&self) -> RefreshMode {
        match *self {
            StoreResult::NotFound => RefreshMode {
                baseline: None,
                skip_saving: false,
            },
            StoreResult::Expired(meta) | StoreResult::Invalid(meta) => RefreshMode {
                baseline: Some(meta),
                skip_saving: false,
            },
            StoreResult::Unstable(meta) => RefreshMode {
                baseline: Some(meta),
                skip_saving: true,
            },
        }
    }
}
