//! Key and value codecs.
//!
//! The store is polymorphic over two capability sets: a [`KeyCodec`] that
//! round-trips keys to bytes and supplies the equality relation and the
//! stable 64-bit hash used for shard routing, and a [`ValueCodec`] that
//! round-trips values. Built-ins live in [`key`] and [`value`]; callers may
//! supply their own implementations.

use crate::error::StoreResult;

pub mod key;
pub mod value;

pub use key::{GuidKeyCodec, I64KeyCodec, RawKeyCodec, Utf8KeyCodec};
pub use value::{JsonValueCodec, RawValueCodec, Utf8ValueCodec};

/// Byte codec, equality relation, and stable hash for key type `K`.
///
/// `hash64` must be deterministic across processes and platforms: the shard
/// a key routes to is derived from it, so an unstable hash silently strands
/// existing data in the wrong shard file.
pub trait KeyCodec<K>: Send + Sync {
    fn encode(&self, key: &K) -> Vec<u8>;
    fn decode(&self, bytes: &[u8]) -> StoreResult<K>;
    fn equals(&self, a: &K, b: &K) -> bool;
    fn hash64(&self, key: &K) -> u64;
}

/// Byte serialiser for value type `V`.
pub trait ValueCodec<V>: Send + Sync {
    fn serialize(&self, value: &V) -> StoreResult<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> StoreResult<V>;
}

/// Maps a key type to its built-in codec for the `open_default` constructors.
pub trait DefaultKeyCodec: Sized {
    type Codec: KeyCodec<Self> + Default;

    fn default_key_codec() -> Self::Codec {
        Self::Codec::default()
    }
}

/// Maps a value type to its built-in codec for the `open_default` constructors.
pub trait DefaultValueCodec: Sized {
    type Codec: ValueCodec<Self> + Default;

    fn default_value_codec() -> Self::Codec {
        Self::Codec::default()
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over a byte slice. Endianness-independent by construction.
#[inline]
pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
