//! Built-in key codecs.

use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

use super::{fnv1a64, DefaultKeyCodec, KeyCodec};

/// UTF-8 string keys, hashed with FNV-1a over the encoded bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8KeyCodec;

impl KeyCodec<String> for Utf8KeyCodec {
    fn encode(&self, key: &String) -> Vec<u8> {
        key.as_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<String> {
        String::from_utf8(bytes.to_vec()).map_err(|err| StoreError::Codec {
            reason: format!("key is not valid UTF-8: {err}"),
        })
    }

    fn equals(&self, a: &String, b: &String) -> bool {
        a == b
    }

    fn hash64(&self, key: &String) -> u64 {
        fnv1a64(key.as_bytes())
    }
}

impl DefaultKeyCodec for String {
    type Codec = Utf8KeyCodec;
}

/// Raw byte-sequence keys, hashed with FNV-1a.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawKeyCodec;

impl KeyCodec<Vec<u8>> for RawKeyCodec {
    fn encode(&self, key: &Vec<u8>) -> Vec<u8> {
        key.clone()
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn equals(&self, a: &Vec<u8>, b: &Vec<u8>) -> bool {
        a == b
    }

    fn hash64(&self, key: &Vec<u8>) -> u64 {
        fnv1a64(key)
    }
}

impl DefaultKeyCodec for Vec<u8> {
    type Codec = RawKeyCodec;
}

/// 128-bit GUID keys stored in their 16-byte little-endian form.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidKeyCodec;

impl KeyCodec<Uuid> for GuidKeyCodec {
    fn encode(&self, key: &Uuid) -> Vec<u8> {
        key.to_bytes_le().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Uuid> {
        let raw: [u8; 16] = bytes.try_into().map_err(|_| StoreError::Codec {
            reason: format!("GUID key must be 16 bytes, got {}", bytes.len()),
        })?;
        Ok(Uuid::from_bytes_le(raw))
    }

    fn equals(&self, a: &Uuid, b: &Uuid) -> bool {
        a == b
    }

    fn hash64(&self, key: &Uuid) -> u64 {
        fnv1a64(&key.to_bytes_le())
    }
}

impl DefaultKeyCodec for Uuid {
    type Codec = GuidKeyCodec;
}

/// Multiplier from Knuth's multiplicative hashing scheme (golden ratio of 2^64).
const KNUTH_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// 64-bit signed integer keys as 8 little-endian bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64KeyCodec;

impl KeyCodec<i64> for I64KeyCodec {
    fn encode(&self, key: &i64) -> Vec<u8> {
        key.to_le_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<i64> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Codec {
            reason: format!("i64 key must be 8 bytes, got {}", bytes.len()),
        })?;
        Ok(i64::from_le_bytes(raw))
    }

    fn equals(&self, a: &i64, b: &i64) -> bool {
        a == b
    }

    fn hash64(&self, key: &i64) -> u64 {
        (*key as u64).wrapping_mul(KNUTH_MULTIPLIER)
    }
}

impl DefaultKeyCodec for i64 {
    type Codec = I64KeyCodec;
}
