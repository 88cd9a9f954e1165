//! The storage engine: single-file stores and the sharded facade.

pub mod file;
pub mod iter;
pub mod sharded;

mod format;
mod fs;
mod index;
mod recovery;

pub use file::FileStore;
pub use iter::LiveScan;
pub use sharded::ShardedStore;

/// Default upper bound on a batch chunk's serialised size.
pub const DEFAULT_BATCH_CHUNK_BYTES: u64 = 8 << 20;

/// Tuning knobs for a single-file store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Fsync every successful mutation before returning.
    pub write_through: bool,
    /// Batch records are packed into contiguous buffers of at most this
    /// many bytes, one write syscall per buffer. A single oversize record
    /// still gets a chunk of its own.
    pub max_batch_chunk_bytes: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            write_through: false,
            max_batch_chunk_bytes: DEFAULT_BATCH_CHUNK_BYTES,
        }
    }
}

impl StoreOptions {
    pub fn new(write_through: bool) -> Self {
        Self {
            write_through,
            ..Self::default()
        }
    }

    pub fn with_write_through(mut self, write_through: bool) -> Self {
        self.write_through = write_through;
        self
    }

    pub fn with_max_batch_chunk_bytes(mut self, bytes: u64) -> Self {
        // A chunk must fit at least one minimal record's framing.
        self.max_batch_chunk_bytes = bytes.max(64);
        self
    }
}

/// Tuning knobs for a sharded store.
#[derive(Debug, Clone)]
pub struct ShardedOptions {
    /// Number of independent shard files. Fixed for the lifetime of the
    /// data: reopening with a different count misroutes keys.
    pub shard_count: usize,
    /// Threads for concurrent shard dispatch; 1 means sequential.
    pub thread_count: usize,
    /// Per-shard store options.
    pub store: StoreOptions,
}

impl ShardedOptions {
    pub fn new(shard_count: usize) -> Self {
        Self {
            shard_count,
            thread_count: 1,
            store: StoreOptions::default(),
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count.max(1);
        self
    }

    pub fn with_write_through(mut self, write_through: bool) -> Self {
        self.store.write_through = write_through;
        self
    }

    pub fn with_store_options(mut self, store: StoreOptions) -> Self {
        self.store = store;
        self
    }
}
