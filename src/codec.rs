//! Encoding of [`CacheEntry`] records to the bytes held by the backing store.
//!
//! Both codecs reject any record that is not exactly `data` plus `meta { created, updated }`.
//! JSON is the default since it is the format other clients of a shared store are likely to
//! read and write. Bincode is more compact but cannot carry self-describing payloads such as
//! `serde_json::Value`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entry::CacheEntry;
use crate::error::CodecError;

/// Abstracts away the selection of the store wire format.
pub trait EntryCodec: Send + Sync + 'static {
    /// Short name used in log events.
    const NAME: &'static str;

    fn encode<Value: Serialize>(entry: &CacheEntry<Value>) -> Result<Vec<u8>, CodecError>;

    fn decode<Value: DeserializeOwned>(bytes: &[u8]) -> Result<CacheEntry<Value>, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EntryCodec for JsonCodec {
    const NAME: &'static str = "json";

    fn encode<Value: Serialize>(entry: &CacheEntry<Value>) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(entry)?)
    }

    fn decode<Value: DeserializeOwned>(bytes: &[u8]) -> Result<CacheEntry<Value>, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl EntryCodec for BincodeCodec {
    const NAME: &'static str = "bincode";

    fn encode<Value: Serialize>(entry: &CacheEntry<Value>) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(entry)?)
    }

    fn decode<Value: DeserializeOwned>(bytes: &[u8]) -> Result<CacheEntry<Value>, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
