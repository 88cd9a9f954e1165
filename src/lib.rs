//! # Shardlog
//!
//! A log-structured, crash-safe, multi-shard embedded key-value store.
//!
//! ## Features
//!
//! - **Durable persistence**: every mutation is an append to a framed log;
//!   `write_through` mode fsyncs before returning
//! - **Crash safety**: torn tails are detected and truncated on open
//! - **Concurrent reads and writes**: positional reads overlap appends;
//!   writers serialise on a dedicated slot; compaction is stop-the-world
//!   per shard
//! - **Online compaction**: atomically rewrites a log to one record per
//!   live key
//! - **Sharding**: parallel batches over independent shard files, routed by
//!   a stable 64-bit key hash
//! - **Pluggable codecs**: keys and values are opaque bytes; built-in codecs
//!   for strings, raw bytes, GUIDs, integers, and JSON values
//!
//! ## Quick Start
//!
//! ```ignore
//! use shardlog::{FileStore, StoreResult};
//! use shardlog::codec::{Utf8KeyCodec, Utf8ValueCodec};
//!
//! let store = FileStore::open("./data/users.log", Utf8KeyCodec, Utf8ValueCodec, true)?;
//!
//! store.put("alice".to_string(), &"metadata".to_string())?;
//! assert_eq!(store.get(&"alice".to_string())?, Some("metadata".to_string()));
//!
//! store.delete(&"alice".to_string())?;
//! store.compact()?;
//! # Ok::<(), shardlog::StoreError>(())
//! ```
//!
//! For parallel workloads, [`ShardedStore`] spreads keys over independent
//! shard files and dispatches batches concurrently:
//!
//! ```ignore
//! use shardlog::{ShardedStore, ShardedOptions};
//! use shardlog::codec::{Utf8KeyCodec, Utf8ValueCodec};
//! use std::sync::Arc;
//!
//! let store = ShardedStore::open_with(
//!     "./data/kv",
//!     Arc::new(Utf8KeyCodec),
//!     Arc::new(Utf8ValueCodec),
//!     ShardedOptions::new(4).with_thread_count(4),
//! )?;
//! store.put_batch((0..1000).map(|i| (format!("k{i}"), format!("v{i}"))), true)?;
//! store.compact_all()?;
//! # Ok::<(), shardlog::StoreError>(())
//! ```

pub mod api;
pub mod codec;
pub mod store;

pub use crate::api::{error, types};

pub use api::error::{StoreError, StoreResult};
pub use api::types::{CancelToken, IndexEntry, StoreStats};
pub use codec::{
    DefaultKeyCodec, DefaultValueCodec, GuidKeyCodec, I64KeyCodec, JsonValueCodec, KeyCodec,
    RawKeyCodec, RawValueCodec, Utf8KeyCodec, Utf8ValueCodec, ValueCodec,
};
pub use store::{
    FileStore, LiveScan, ShardedOptions, ShardedStore, StoreOptions, DEFAULT_BATCH_CHUNK_BYTES,
};
