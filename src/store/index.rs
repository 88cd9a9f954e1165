//! In-memory key → record-locator index.
//!
//! Keyed under the *codec's* equality relation and 64-bit hash rather than
//! `std::hash::Hash`, so a caller-supplied codec fully controls which keys
//! collide. Admits many concurrent readers; writers serialise on the table
//! lock per update.

use std::sync::Arc;

use hashbrown::raw::RawTable;
use parking_lot::RwLock;

use crate::codec::KeyCodec;
use crate::types::IndexEntry;

pub(crate) struct KeyIndex<K, C> {
    table: RwLock<RawTable<(K, IndexEntry)>>,
    codec: Arc<C>,
}

impl<K, C> KeyIndex<K, C>
where
    K: Clone,
    C: KeyCodec<K>,
{
    pub(crate) fn new(codec: Arc<C>) -> Self {
        Self {
            table: RwLock::new(RawTable::new()),
            codec,
        }
    }

    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.codec.hash64(key)
    }

    pub(crate) fn get(&self, key: &K) -> Option<IndexEntry> {
        let table = self.table.read();
        let hash = self.hash(key);
        table
            .get(hash, |(candidate, _)| self.codec.equals(candidate, key))
            .map(|(_, entry)| *entry)
    }

    /// True iff the key has a non-tombstoned entry.
    pub(crate) fn is_live(&self, key: &K) -> bool {
        self.get(key).is_some_and(|entry| entry.is_live())
    }

    /// Inserts or overwrites the entry for `key`.
    pub(crate) fn upsert(&self, key: K, entry: IndexEntry) {
        let mut table = self.table.write();
        let hash = self.codec.hash64(&key);
        if let Some((_, existing)) =
            table.get_mut(hash, |(candidate, _)| self.codec.equals(candidate, &key))
        {
            *existing = entry;
        } else {
            table.insert(hash, (key, entry), |(candidate, _)| {
                self.codec.hash64(candidate)
            });
        }
    }

    pub(crate) fn record_put(&self, key: K, value_offset: u64, value_len: u32) {
        self.upsert(key, IndexEntry::live(value_offset, value_len));
    }

    pub(crate) fn record_delete(&self, key: K) {
        self.upsert(key, IndexEntry::tombstone());
    }

    pub(crate) fn clear(&self) {
        self.table.write().clear();
    }

    /// Eager snapshot of all live `(key, entry)` pairs.
    ///
    /// Scans and compaction iterate this snapshot so entries added after the
    /// call may or may not be observed, per the iteration contract.
    pub(crate) fn live_entries(&self) -> Vec<(K, IndexEntry)> {
        let table = self.table.read();
        let mut out = Vec::with_capacity(table.len());

        // SAFETY: RawTable::iter() yields valid buckets for the lifetime of
        // the read guard; every bucket holds a (K, IndexEntry) inserted above.
        unsafe {
            for bucket in table.iter() {
                let (key, entry) = bucket.as_ref();
                if entry.is_live() {
                    out.push((key.clone(), *entry));
                }
            }
        }

        out
    }

    /// (live, tombstoned) entry counts.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let table = self.table.read();
        let mut tombstones = 0;

        // SAFETY: as in `live_entries`.
        unsafe {
            for bucket in table.iter() {
                let (_, entry) = bucket.as_ref();
                if entry.tombstone {
                    tombstones += 1;
                }
            }
        }

        (table.len() - tombstones, tombstones)
    }
}
