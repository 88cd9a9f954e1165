//! Live-set iteration.

use crate::codec::{KeyCodec, ValueCodec};
use crate::error::StoreResult;
use crate::types::IndexEntry;

use super::file::FileStore;

/// Iterator over the live set of a [`FileStore`].
///
/// The index snapshot is taken eagerly when the iterator is created; each
/// value is read fresh from disk on `next`. No lock is held between yielded
/// items, so mutations observed mid-iteration affect the values read but
/// never the set of keys visited.
pub struct LiveScan<'a, K, V, KC, VC>
where
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    store: &'a FileStore<K, V, KC, VC>,
    entries: std::vec::IntoIter<(K, IndexEntry)>,
}

impl<'a, K, V, KC, VC> LiveScan<'a, K, V, KC, VC>
where
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    pub(crate) fn new(store: &'a FileStore<K, V, KC, VC>, entries: Vec<(K, IndexEntry)>) -> Self {
        Self {
            store,
            entries: entries.into_iter(),
        }
    }
}

impl<K, V, KC, VC> Iterator for LiveScan<'_, K, V, KC, VC>
where
    K: Clone,
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
    type Item = StoreResult<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, entry) = self.entries.next()?;
        Some(self.store.read_live_pair(key, entry))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V, KC, VC> ExactSizeIterator for LiveScan<'_, K, V, KC, VC>
where
    K: Clone,
    KC: KeyCodec<K>,
    VC: ValueCodec<V>,
{
}
