//! Single-file store: one append-only log, one in-memory index.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::hash::Hash;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::codec::{DefaultKeyCodec, DefaultValueCodec, KeyCodec, ValueCodec};
use crate::error::{StoreError, StoreResult};
use crate::types::{CancelToken, IndexEntry, StoreStats};

use super::format::{self, OP_PUT};
use super::fs::{sync_directory, LogLockGuard};
use super::index::KeyIndex;
use super::iter::LiveScan;
use super::recovery::replay_log;
use super::StoreOptions;

/// Append state: the write handle and the durable end-of-file cursor.
///
/// Guarded by the writer slot; appenders serialise here while readers use
/// positional reads against a separate handle.
struct LogWriter {
    file: File,
    cursor: u64,
}

impl LogWriter {
    /// Appends `bytes` at the cursor, fsyncing when requested. Any failure
    /// rewinds the file to the pre-write offset so a short or unsynced
    /// write never leaves half a record before the next append.
    fn append_synced(&mut self, bytes: &[u8], sync: bool) -> StoreResult<u64> {
        let write_offset = self.cursor;
        let result = (|| -> StoreResult<()> {
            self.file.write_all(bytes)?;
            if sync {
                self.file.sync_data()?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.cursor += bytes.len() as u64;
                Ok(write_offset)
            }
            Err(err) => {
                let _ = self.file.set_len(write_offset);
                Err(err)
            }
        }
    }

    fn sync(&self) -> StoreResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// A deferred index update for one record of a batch chunk. Applied only
/// after the chunk's bytes are durably on disk.
enum PendingUpdate<K> {
    Put {
        key: K,
        rel_value_offset: u64,
        value_len: u32,
    },
    Delete {
        key: K,
    },
}

/// Records of one batch serialised end-to-end, written with a single
/// `write_all` per chunk.
struct BatchChunk<K> {
    buf: Vec<u8>,
    pending: Vec<PendingUpdate<K>>,
    limit: u64,
}

impl<K> BatchChunk<K> {
    fn new(limit: u64) -> Self {
        Self {
            buf: Vec::new(),
            pending: Vec::new(),
            limit,
        }
    }

    /// A record larger than the limit still gets a chunk of its own.
    fn would_overflow(&self, record_len: u64) -> bool {
        !self.buf.is_empty() && self.buf.len() as u64 + record_len > self.limit
    }

    fn push_put(&mut self, key: K, key_bytes: &[u8], value_bytes: &[u8]) -> StoreResult<()> {
        let rel_value_offset =
            self.buf.len() as u64 + format::value_offset_in_record(key_bytes.len());
        format::encode_put(&mut self.buf, key_bytes, value_bytes)?;
        self.pending.push(PendingUpdate::Put {
            key,
            rel_value_offset,
            value_len: value_bytes.len() as u32,
        });
        Ok(())
    }

    fn push_delete(&mut self, key: K, key_bytes: &[u8]) -> StoreResult<()> {
        format::encode_delete(&mut self.buf, key_bytes)?;
        self.pending.push(PendingUpdate::Delete { key });
        Ok(())
    }
}

fn check_cancel(cancel: Option<&CancelToken>) -> StoreResult<()> {
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

fn compacting_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".compacting");
    PathBuf::from(raw)
}

/// Log-structured store over a single append-only file.
///
/// Owns the file exclusively for its lifetime. Reads take the shared gate
/// and positional reads; mutations additionally serialise on the writer
/// slot; compaction, seeding and flush take the gate exclusively.
pub struct FileStore<K, V, KC, VC>
where
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    path: PathBuf,
    options: StoreOptions,
    key_codec: Arc<KC>,
    value_codec: Arc<VC>,
    index: KeyIndex<K, KC>,
    gate: RwLock<()>,
    writer: Mutex<LogWriter>,
    reader: RwLock<File>,
    _lock: LogLockGuard,
    _value: PhantomData<fn() -> V>,
}

impl<K, V, KC, VC> FileStore<K, V, KC, VC>
where
    K: Clone,
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    /// Opens (creating if absent) and recovers the log at `path`.
    ///
    /// With `write_through` every successful mutation is fsynced before it
    /// returns; otherwise durability is deferred to `flush` or the batch
    /// `flush` flag.
    pub fn open(
        path: impl AsRef<Path>,
        key_codec: KC,
        value_codec: VC,
        write_through: bool,
    ) -> StoreResult<Self> {
        Self::open_with(
            path,
            Arc::new(key_codec),
            Arc::new(value_codec),
            StoreOptions::new(write_through),
        )
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        key_codec: Arc<KC>,
        value_codec: Arc<VC>,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock = LogLockGuard::acquire(&path)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let index = KeyIndex::new(Arc::clone(&key_codec));
        let cursor = Self::replay_into_index(&path, key_codec.as_ref(), &index)?;
        let reader = OpenOptions::new().read(true).open(&path)?;

        Ok(Self {
            path,
            options,
            key_codec,
            value_codec,
            index,
            gate: RwLock::new(()),
            writer: Mutex::new(LogWriter { file, cursor }),
            reader: RwLock::new(reader),
            _lock: lock,
            _value: PhantomData,
        })
    }

    fn replay_into_index(path: &Path, codec: &KC, index: &KeyIndex<K, KC>) -> StoreResult<u64> {
        replay_log(path, |record| {
            let key = codec.decode(record.key_bytes)?;
            if record.op == OP_PUT {
                index.record_put(key, record.value_offset, record.value_len);
            } else {
                index.record_delete(key);
            }
            Ok(())
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_write_through(&self) -> bool {
        self.options.write_through
    }

    /// Returns the current value for `key`, freshly read from disk.
    pub fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let _gate = self.gate.read();
        let Some(entry) = self.index.get(key) else {
            return Ok(None);
        };
        if entry.tombstone {
            return Ok(None);
        }
        let bytes = self.read_value(&entry)?;
        Ok(Some(self.value_codec.deserialize(&bytes)?))
    }

    /// Upserts one pair.
    pub fn put(&self, key: K, value: &V) -> StoreResult<()> {
        let key_bytes = self.key_codec.encode(&key);
        let value_bytes = self.value_codec.serialize(value)?;
        let mut record = Vec::new();
        format::encode_put(&mut record, &key_bytes, &value_bytes)?;

        let _gate = self.gate.read();
        let mut writer = self.writer.lock();
        let write_offset = writer.append_synced(&record, self.options.write_through)?;
        self.index.record_put(
            key,
            write_offset + format::value_offset_in_record(key_bytes.len()),
            value_bytes.len() as u32,
        );
        Ok(())
    }

    /// Deletes one key. Returns true iff a live key became absent; deleting
    /// an absent or tombstoned key writes nothing.
    pub fn delete(&self, key: &K) -> StoreResult<bool> {
        let key_bytes = self.key_codec.encode(key);
        let mut record = Vec::new();
        format::encode_delete(&mut record, &key_bytes)?;

        let _gate = self.gate.read();
        let mut writer = self.writer.lock();
        if !self.index.is_live(key) {
            return Ok(false);
        }
        writer.append_synced(&record, self.options.write_through)?;
        self.index.record_delete(key.clone());
        Ok(true)
    }

    /// Bulk upsert, chunked into contiguous buffers of at most
    /// `max_batch_chunk_bytes` with one write per chunk.
    pub fn put_batch<I>(&self, entries: I, flush: bool) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.put_batch_with(entries, flush, None)
    }

    /// `put_batch` with a cancellation token observed between chunks.
    pub fn put_batch_with<I>(
        &self,
        entries: I,
        flush: bool,
        cancel: Option<&CancelToken>,
    ) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut chunk = BatchChunk::new(self.options.max_batch_chunk_bytes);
        for (key, value) in entries {
            let key_bytes = self.key_codec.encode(&key);
            let value_bytes = self.value_codec.serialize(&value)?;
            if chunk.would_overflow(format::record_size(key_bytes.len(), value_bytes.len())) {
                self.commit_chunk(&mut chunk, flush)?;
                check_cancel(cancel)?;
            }
            chunk.push_put(key, &key_bytes, &value_bytes)?;
        }
        self.commit_chunk(&mut chunk, flush)?;
        Ok(())
    }

    /// Bulk delete with the same chunking policy as `put_batch`. Keys that
    /// are absent or already tombstoned are skipped without writing a
    /// record. Returns the number of keys actually deleted.
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
        let mut chunk = BatchChunk::new(self.options.max_batch_chunk_bytes);
        let mut deleted = 0usize;
        // Keys already tombstoned earlier in this batch but not yet
        // committed to the index; mirrors point-delete suppression.
        let mut batch_seen: HashSet<Vec<u8>> = HashSet::new();
        for key in keys {
            {
                let _gate = self.gate.read();
                if !self.index.is_live(&key) {
                    continue;
                }
            }
            let key_bytes = self.key_codec.encode(&key);
            if batch_seen.contains(&key_bytes) {
                continue;
            }
            if chunk.would_overflow(format::record_size(key_bytes.len(), 0)) {
                deleted += self.commit_chunk(&mut chunk, flush)?;
                check_cancel(cancel)?;
            }
            batch_seen.insert(key_bytes.clone());
            chunk.push_delete(key, &key_bytes)?;
        }
        deleted += self.commit_chunk(&mut chunk, flush)?;
        Ok(deleted)
    }

    /// Writes one assembled chunk and, only after the bytes are on disk,
    /// walks it again to update the index. Returns the record count.
    fn commit_chunk(&self, chunk: &mut BatchChunk<K>, flush: bool) -> StoreResult<usize> {
        if chunk.pending.is_empty() {
            return Ok(0);
        }

        let _gate = self.gate.read();
        let mut writer = self.writer.lock();
        let write_offset =
            writer.append_synced(&chunk.buf, flush || self.options.write_through)?;

        let count = chunk.pending.len();
        for pending in chunk.pending.drain(..) {
            match pending {
                PendingUpdate::Put {
                    key,
                    rel_value_offset,
                    value_len,
                } => self
                    .index
                    .record_put(key, write_offset + rel_value_offset, value_len),
                PendingUpdate::Delete { key } => self.index.record_delete(key),
            }
        }
        chunk.buf.clear();
        Ok(count)
    }

    /// Bulk load. With `truncate` the file and the index are reset first;
    /// either way the batch itself is written flushed.
    pub fn seed<I>(&self, entries: I, truncate: bool) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        if truncate {
            let _gate = self.gate.write();
            let mut writer = self.writer.lock();
            writer.file.set_len(0)?;
            writer.file.sync_data()?;
            writer.cursor = 0;
            self.index.clear();
        }
        self.put_batch(entries, true)
    }

    /// Iterates the live set against an index snapshot taken now. Values are
    /// read fresh from disk per item; no lock is held between items, so the
    /// iterator must not outlive a concurrent compaction's rewrite.
    pub fn scan_live(&self) -> LiveScan<'_, K, V, KC, VC> {
        let entries = {
            let _gate = self.gate.read();
            self.index.live_entries()
        };
        LiveScan::new(self, entries)
    }

    /// Materialises the live set into a RAM map.
    pub fn snapshot(&self) -> StoreResult<HashMap<K, V>>
    where
        K: Eq + Hash,
    {
        let mut map = HashMap::new();
        for pair in self.scan_live() {
            let (key, value) = pair?;
            map.insert(key, value);
        }
        Ok(map)
    }

    pub(crate) fn read_live_pair(&self, key: K, entry: IndexEntry) -> StoreResult<(K, V)> {
        let _gate = self.gate.read();
        let bytes = self.read_value(&entry)?;
        let value = self.value_codec.deserialize(&bytes)?;
        Ok((key, value))
    }

    fn read_value(&self, entry: &IndexEntry) -> StoreResult<Vec<u8>> {
        let mut buf = vec![0u8; entry.value_len as usize];
        let reader = self.reader.read();
        reader
            .read_exact_at(&mut buf, entry.value_offset)
            .map_err(|err| {
                if err.kind() == ErrorKind::UnexpectedEof {
                    StoreError::IndexDrift {
                        offset: entry.value_offset,
                        len: entry.value_len,
                    }
                } else {
                    StoreError::Io(err)
                }
            })?;
        Ok(buf)
    }

    /// Rewrites the log to contain exactly one PUT per live key.
    ///
    /// Runs stop-the-world for this store: the compacted copy is written to
    /// `<path>.compacting`, fsynced, renamed over the live file, and the
    /// index is rebuilt from the new file. An interrupted compaction leaves
    /// the original file untouched.
    pub fn compact(&self) -> StoreResult<()> {
        self.compact_with(None)
    }

    pub fn compact_with(&self, cancel: Option<&CancelToken>) -> StoreResult<()> {
        let _gate = self.gate.write();
        let mut writer = self.writer.lock();

        let live = self.index.live_entries();
        let tmp_path = compacting_path(&self.path);
        if tmp_path.exists() {
            std::fs::remove_file(&tmp_path)?;
        }
        let mut tmp = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;

        if let Err(err) = self.write_compacted(&mut tmp, &live, cancel) {
            drop(tmp);
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err);
        }
        drop(tmp);

        std::fs::rename(&tmp_path, &self.path)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                sync_directory(parent)?;
            }
        }

        writer.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        self.index.clear();
        writer.cursor = Self::replay_into_index(&self.path, self.key_codec.as_ref(), &self.index)?;
        *self.reader.write() = OpenOptions::new().read(true).open(&self.path)?;

        tracing::info!(
            path = ?self.path,
            live_keys = live.len(),
            file_bytes = writer.cursor,
            "compaction complete"
        );
        Ok(())
    }

    fn write_compacted(
        &self,
        tmp: &mut File,
        live: &[(K, IndexEntry)],
        cancel: Option<&CancelToken>,
    ) -> StoreResult<()> {
        let reader = self.reader.read();
        let mut buf = Vec::new();
        for (key, entry) in live {
            check_cancel(cancel)?;
            let mut value = vec![0u8; entry.value_len as usize];
            reader
                .read_exact_at(&mut value, entry.value_offset)
                .map_err(|err| {
                    if err.kind() == ErrorKind::UnexpectedEof {
                        StoreError::IndexDrift {
                            offset: entry.value_offset,
                            len: entry.value_len,
                        }
                    } else {
                        StoreError::Io(err)
                    }
                })?;
            let key_bytes = self.key_codec.encode(key);
            format::encode_put(&mut buf, &key_bytes, &value)?;
            if buf.len() as u64 >= self.options.max_batch_chunk_bytes {
                tmp.write_all(&buf)?;
                buf.clear();
            }
        }
        if !buf.is_empty() {
            tmp.write_all(&buf)?;
        }
        tmp.sync_all()?;
        Ok(())
    }

    /// Durable sync of all outstanding writes.
    pub fn flush(&self) -> StoreResult<()> {
        let _gate = self.gate.write();
        let writer = self.writer.lock();
        writer.sync()
    }

    /// Releases the file handles and the lock. No implicit flush beyond
    /// what operations already performed.
    pub fn close(self) -> StoreResult<()> {
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        let _gate = self.gate.read();
        let (live_keys, tombstones) = self.index.counts();
        let file_bytes = self.writer.lock().cursor;
        StoreStats {
            live_keys,
            tombstones,
            file_bytes,
        }
    }
}

impl<K, V> FileStore<K, V, K::Codec, V::Codec>
where
    K: DefaultKeyCodec + Clone,
    V: DefaultValueCodec,
{
    /// Opens a store using the built-in codecs for `K` and `V`.
    pub fn open_default(path: impl AsRef<Path>, write_through: bool) -> StoreResult<Self> {
        Self::open(
            path,
            K::default_key_codec(),
            V::default_value_codec(),
            write_through,
        )
    }
}
