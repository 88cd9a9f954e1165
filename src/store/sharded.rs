//! Sharded facade over independent single-file stores.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::codec::{DefaultKeyCodec, DefaultValueCodec, KeyCodec, ValueCodec};
use crate::error::{StoreError, StoreResult};
use crate::types::{CancelToken, StoreStats};

use super::file::FileStore;
use super::ShardedOptions;

/// N independent [`FileStore`]s routed by the key codec's stable hash.
///
/// Every key lives in exactly one shard, `hash64(key) % shard_count`.
/// Shards share nothing: there is no cross-shard atomicity or ordering, and
/// reopening an existing `base_path` with a different `shard_count` would
/// silently misroute keys, so don't.
pub struct ShardedStore<K, V, KC, VC>
where
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    base_path: PathBuf,
    shards: Vec<FileStore<K, V, KC, VC>>,
    key_codec: Arc<KC>,
    thread_pool: Option<Arc<ThreadPool>>,
}

impl<K, V, KC, VC> ShardedStore<K, V, KC, VC>
where
    K: Clone,
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    /// Opens `shard_count` shard files at `<base_path>.shard{i:02}.log`.
    pub fn open(
        base_path: impl AsRef<Path>,
        shard_count: usize,
        key_codec: KC,
        value_codec: VC,
        write_through: bool,
    ) -> StoreResult<Self> {
        let options = ShardedOptions::new(shard_count).with_write_through(write_through);
        Self::open_with(base_path, Arc::new(key_codec), Arc::new(value_codec), options)
    }

    pub fn open_with(
        base_path: impl AsRef<Path>,
        key_codec: Arc<KC>,
        value_codec: Arc<VC>,
        options: ShardedOptions,
    ) -> StoreResult<Self> {
        if options.shard_count == 0 {
            return Err(StoreError::Unsupported {
                reason: "shard_count must be at least 1".to_string(),
            });
        }

        let base_path = base_path.as_ref().to_path_buf();
        let shards = (0..options.shard_count)
            .map(|index| {
                FileStore::open_with(
                    Self::shard_path(&base_path, index),
                    Arc::clone(&key_codec),
                    Arc::clone(&value_codec),
                    options.store.clone(),
                )
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let thread_pool = if options.thread_count > 1 {
            Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(options.thread_count)
                    .build()?,
            ))
        } else {
            None
        };

        Ok(Self {
            base_path,
            shards,
            key_codec,
            thread_pool,
        })
    }

    /// Path of shard `index` for a store rooted at `base_path`.
    pub fn shard_path(base_path: &Path, index: usize) -> PathBuf {
        let mut raw = base_path.as_os_str().to_os_string();
        raw.push(format!(".shard{index:02}.log"));
        PathBuf::from(raw)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard index a key routes to; stable across opens and platforms.
    pub fn shard_index(&self, key: &K) -> usize {
        (self.key_codec.hash64(key) % self.shards.len() as u64) as usize
    }

    fn shard_for(&self, key: &K) -> &FileStore<K, V, KC, VC> {
        &self.shards[self.shard_index(key)]
    }

    pub fn get(&self, key: &K) -> StoreResult<Option<V>> {
        self.shard_for(key).get(key)
    }

    pub fn put(&self, key: K, value: &V) -> StoreResult<()> {
        self.shard_for(&key).put(key, value)
    }

    pub fn delete(&self, key: &K) -> StoreResult<bool> {
        self.shard_for(key).delete(key)
    }

    fn partition<T>(&self, items: impl IntoIterator<Item = T>, index: impl Fn(&T) -> usize) -> Vec<Vec<T>> {
        let mut partitions: Vec<Vec<T>> = (0..self.shards.len()).map(|_| Vec::new()).collect();
        for item in items {
            let shard = index(&item);
            partitions[shard].push(item);
        }
        partitions
    }

    /// Materialises the live sets of all shards into one RAM map.
    pub fn snapshot_all(&self) -> StoreResult<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        let mut map = HashMap::new();
        for shard in &self.shards {
            for pair in shard.scan_live() {
                let (key, value) = pair?;
                map.insert(key, value);
            }
        }
        Ok(map)
    }

    /// Concatenated per-shard scans. No cross-shard ordering guarantee.
    pub fn scan_all_live(&self) -> impl Iterator<Item = StoreResult<(K, V)>> + '_ {
        self.shards.iter().flat_map(|shard| shard.scan_live())
    }

    /// Aggregated counters across all shards.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for shard in &self.shards {
            stats.merge(shard.stats());
        }
        stats
    }

    /// Durable sync of every shard.
    pub fn flush_all(&self) -> StoreResult<()> {
        for shard in &self.shards {
            shard.flush()?;
        }
        Ok(())
    }

    /// Releases all shards. No implicit flush.
    pub fn close(self) -> StoreResult<()> {
        for shard in self.shards {
            shard.close()?;
        }
        Ok(())
    }
}

impl<K, V, KC, VC> ShardedStore<K, V, KC, VC>
where
    K: Clone + Send + Sync,
    V: Send,
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    /// Bulk upsert: groups entries by shard and dispatches one sub-batch
    /// per shard, concurrently when a thread pool is configured. Returns
    /// once every shard has completed.
    pub fn put_batch<I>(&self, entries: I, flush: bool) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.put_batch_with(entries, flush, None)
    }

    pub fn put_batch_with<I>(
        &self,
        entries: I,
        flush: bool,
        cancel: Option<&CancelToken>,
    ) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let partitions = self.partition(entries, |(key, _)| self.shard_index(key));
        match &self.thread_pool {
            Some(pool) => pool.install(|| {
                self.shards
                    .par_iter()
                    .zip(partitions.into_par_iter())
                    .try_for_each(|(shard, batch)| {
                        if batch.is_empty() {
                            Ok(())
                        } else {
                            shard.put_batch_with(batch, flush, cancel)
                        }
                    })
            }),
            None => {
                for (shard, batch) in self.shards.iter().zip(partitions) {
                    if !batch.is_empty() {
                        shard.put_batch_with(batch, flush, cancel)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Bulk delete with the same dispatch as `put_batch`. Returns the total
    /// number of keys actually deleted across shards.
    pub fn delete_batch<I>(&self, keys: I, flush: bool) -> StoreResult<usize>
    where
        I: IntoIterator<Item = K>,
    {
        self.delete_batch_with(keys, flush, None)
    }

    pub fn delete_batch_with<I>(
        &self,
        keys: I,
        flush: bool,
        cancel: Option<&CancelToken>,
    ) -> StoreResult<usize>
    where
        I: IntoIterator<Item = K>,
    {
        let partitions = self.partition(keys, |key| self.shard_index(key));
        match &self.thread_pool {
            Some(pool) => pool.install(|| {
                let counts = self
                    .shards
                    .par_iter()
                    .zip(partitions.into_par_iter())
                    .map(|(shard, keys)| {
                        if keys.is_empty() {
                            Ok(0)
                        } else {
                            shard.delete_batch_with(keys, flush, cancel)
                        }
                    })
                    .collect::<StoreResult<Vec<usize>>>()?;
                Ok(counts.into_iter().sum())
            }),
            None => {
                let mut deleted = 0;
                for (shard, keys) in self.shards.iter().zip(partitions) {
                    if !keys.is_empty() {
                        deleted += shard.delete_batch_with(keys, flush, cancel)?;
                    }
                }
                Ok(deleted)
            }
        }
    }

    /// Compacts every shard, concurrently when a thread pool is configured.
    pub fn compact_all(&self) -> StoreResult<()> {
        self.compact_all_with(None)
    }

    pub fn compact_all_with(&self, cancel: Option<&CancelToken>) -> StoreResult<()> {
        match &self.thread_pool {
            Some(pool) => pool.install(|| {
                self.shards
                    .par_iter()
                    .try_for_each(|shard| shard.compact_with(cancel))
            }),
            None => {
                for shard in &self.shards {
                    shard.compact_with(cancel)?;
                }
                Ok(())
            }
        }
    }
}

impl<K, V> ShardedStore<K, V, K::Codec, V::Codec>
where
    K: DefaultKeyCodec + Clone,
    V: DefaultValueCodec,
{
    /// Opens a sharded store using the built-in codecs for `K` and `V`.
    pub fn open_default(
        base_path: impl AsRef<Path>,
        shard_count: usize,
        write_through: bool,
    ) -> StoreResult<Self> {
        Self::open(
            base_path,
            shard_count,
            K::default_key_codec(),
            V::default_value_codec(),
            write_through,
        )
    }
}
