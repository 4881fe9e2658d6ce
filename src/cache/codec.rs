use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use super::backend::CacheError;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, CacheError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| CacheError::Codec(err.to_string()))
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CacheError> {
    serde_json::from_slice(payload).map_err(|err| CacheError::Codec(err.to_string()))
}
