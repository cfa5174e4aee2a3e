//! Store and codec error types.
//!
//! Neither of these ever escapes a cache lookup. They exist for store implementations, for
//! direct codec use, and as structured fields in log events.

use thiserror::Error;

/// Failure reported by a [`KeyValueStore`](crate::store::KeyValueStore).
///
/// A store error says nothing about whether the key is present.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store transport error: {0}")]
    Transport(String),

    #[error("Store unavailable")]
    Unavailable,

    #[error("Corrupt store record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to turn a cache entry into bytes or back.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bincode codec error: {0}")]
    Bincode(#[from] bincode::Error),
}
