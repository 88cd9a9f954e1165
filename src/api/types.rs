use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Locator for the latest record of a key.
///
/// `value_offset` points at the first byte of the value payload inside the
/// log file, not at the record start. Tombstones carry a zero locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub value_offset: u64,
    pub value_len: u32,
    pub tombstone: bool,
}

impl IndexEntry {
    #[inline]
    pub fn live(value_offset: u64, value_len: u32) -> Self {
        Self {
            value_offset,
            value_len,
            tombstone: false,
        }
    }

    #[inline]
    pub fn tombstone() -> Self {
        Self {
            value_offset: 0,
            value_len: 0,
            tombstone: true,
        }
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        !self.tombstone
    }
}

/// Aggregate counters for a store or a shard set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Keys with a non-tombstoned index entry.
    pub live_keys: usize,
    /// Deleted keys still occupying an index slot until the next compaction.
    pub tombstones: usize,
    /// Durable length of the log file(s) in bytes.
    pub file_bytes: u64,
}

impl StoreStats {
    pub(crate) fn merge(&mut self, other: StoreStats) {
        self.live_keys += other.live_keys;
        self.tombstones += other.tombstones;
        self.file_bytes += other.file_bytes;
    }
}

/// Cooperative cancellation flag for batch and compaction operations.
///
/// Cancellation is observed between batch chunks and between compaction
/// records; a chunk already written stays durable. All clones share the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
