//! Built-in value codecs.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

use super::{DefaultValueCodec, ValueCodec};

/// Pass-through byte-sequence values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawValueCodec;

impl ValueCodec<Vec<u8>> for RawValueCodec {
    fn serialize(&self, value: &Vec<u8>) -> StoreResult<Vec<u8>> {
        Ok(value.clone())
    }

    fn deserialize(&self, bytes: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

impl DefaultValueCodec for Vec<u8> {
    type Codec = RawValueCodec;
}

/// UTF-8 string values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8ValueCodec;

impl ValueCodec<String> for Utf8ValueCodec {
    fn serialize(&self, value: &String) -> StoreResult<Vec<u8>> {
        Ok(value.as_bytes().to_vec())
    }

    fn deserialize(&self, bytes: &[u8]) -> StoreResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|err| StoreError::Codec {
            reason: format!("value is not valid UTF-8: {err}"),
        })
    }
}

impl DefaultValueCodec for String {
    type Codec = Utf8ValueCodec;
}

/// JSON-backed codec for arbitrary `serde` types.
pub struct JsonValueCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonValueCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonValueCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonValueCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> ValueCodec<T> for JsonValueCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> StoreResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
