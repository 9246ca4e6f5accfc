use crate::entry::InternalEntry;

use core::fmt;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;

type Shard<K, V, H> = RwLock<HashMap<K, Arc<InternalEntry<V>>, H>>;

/// A helper function to hash a key using a `BuildHasher`.
#[inline]
pub(crate) fn hash_key<K: Hash, H: BuildHasher>(hasher: &H, key: &K) -> u64 {
  hasher.hash_one(key)
}

/// What an [`ShardedStore::update`] closure decided to do with a key.
pub(crate) enum Update<V> {
  /// Leave the key untouched.
  Keep,
  /// Publish a new entry for the key.
  Put(Arc<InternalEntry<V>>),
  /// Delete the key.
  Remove,
}

/// The observable outcome of an [`ShardedStore::update`].
pub(crate) enum Transition<V> {
  /// Nothing changed. Holds the current entry, if any.
  Unchanged(Option<Arc<InternalEntry<V>>>),
  Created(Arc<InternalEntry<V>>),
  Modified {
    before: Arc<InternalEntry<V>>,
    after: Arc<InternalEntry<V>>,
  },
  Removed(Arc<InternalEntry<V>>),
}

impl<V> Transition<V> {
  /// The entry the key maps to after the update.
  pub(crate) fn current(&self) -> Option<&Arc<InternalEntry<V>>> {
    match self {
      Transition::Unchanged(current) => current.as_ref(),
      Transition::Created(after) | Transition::Modified { after, .. } => Some(after),
      Transition::Removed(_) => None,
    }
  }

  pub(crate) fn is_changed(&self) -> bool {
    !matches!(self, Transition::Unchanged(_))
  }
}

/// The single key→entry mapping shared by every façade of a map.
///
/// The store is partitioned into independently locked shards so operations
/// on different keys are unlikely to contend for the same lock. Each
/// [`update`](Self::update) runs under one shard write lock, which makes it
/// the unit of atomicity exposed to the rest of the crate.
pub(crate) struct ShardedStore<K, V, H> {
  shards: Box<[CachePadded<Shard<K, V, H>>]>,
  hasher: H,
}

impl<K, V, H> fmt::Debug for ShardedStore<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedStore")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<K, V, H> ShardedStore<K, V, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  /// Creates a store with `num_shards` shards. `num_shards` must be a
  /// non-zero power of two; the builder guarantees it.
  pub(crate) fn new(num_shards: usize, hasher: H) -> Self {
    debug_assert!(num_shards.is_power_of_two());
    let shards = (0..num_shards)
      .map(|_| CachePadded::new(RwLock::new(HashMap::with_hasher(hasher.clone()))))
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self { shards, hasher }
  }

  #[inline]
  fn shard_index(&self, key: &K) -> usize {
    hash_key(&self.hasher, key) as usize & (self.shards.len() - 1)
  }

  #[inline]
  fn shard(&self, key: &K) -> &Shard<K, V, H> {
    &self.shards[self.shard_index(key)]
  }

  pub(crate) fn num_shards(&self) -> usize {
    self.shards.len()
  }

  /// Returns the entry currently published for `key`.
  pub(crate) fn get(&self, key: &K) -> Option<Arc<InternalEntry<V>>> {
    self.shard(key).read().get(key).cloned()
  }

  /// Atomically inspects the current entry for `key` and replaces or removes
  /// it according to `decide`.
  ///
  /// `decide` runs while the shard's write lock is held, so the entry it sees
  /// is exactly the one it replaces. It must not call back into the store.
  pub(crate) fn update<F>(&self, key: &K, decide: F) -> Transition<V>
  where
    F: FnOnce(Option<&Arc<InternalEntry<V>>>) -> Update<V>,
  {
    let mut guard = self.shard(key).write();
    let decision = decide(guard.get(key));
    match decision {
      Update::Keep => Transition::Unchanged(guard.get(key).cloned()),
      Update::Put(entry) => match guard.insert(key.clone(), entry.clone()) {
        Some(before) => Transition::Modified {
          before,
          after: entry,
        },
        None => Transition::Created(entry),
      },
      Update::Remove => match guard.remove(key) {
        Some(before) => Transition::Removed(before),
        None => Transition::Unchanged(None),
      },
    }
  }

  /// Removes every entry, one shard at a time.
  pub(crate) fn clear(&self) {
    for shard in self.shards.iter() {
      shard.write().clear();
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.read().len()).sum()
  }

  /// Copies out the contents of one shard.
  pub(crate) fn snapshot_shard(&self, index: usize) -> Vec<(K, Arc<InternalEntry<V>>)> {
    self.shards[index]
      .read()
      .iter()
      .map(|(k, e)| (k.clone(), e.clone()))
      .collect()
  }

  /// Iterates over the store one shard snapshot at a time. The iterator
  /// keeps the store alive, so it can outlive the caller's borrow.
  pub(crate) fn snapshot_iter(self: &Arc<Self>) -> SnapshotIter<K, V, H> {
    SnapshotIter {
      store: Arc::clone(self),
      buffer: Vec::new().into_iter(),
      shard_idx: 0,
    }
  }
}

/// An iterator over a semi-consistent snapshot of the store.
///
/// The contents of each shard are copied out the first time the shard is
/// reached, holding its read lock only for the copy. Writes to a shard that
/// has already been scanned are not observed; writes to shards not yet
/// scanned may be.
pub(crate) struct SnapshotIter<K, V, H> {
  store: Arc<ShardedStore<K, V, H>>,
  buffer: std::vec::IntoIter<(K, Arc<InternalEntry<V>>)>,
  shard_idx: usize,
}

impl<K, V, H> Iterator for SnapshotIter<K, V, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  type Item = (K, Arc<InternalEntry<V>>);

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(item) = self.buffer.next() {
        return Some(item);
      }
      if self.shard_idx >= self.store.num_shards() {
        return None;
      }
      self.buffer = self.store.snapshot_shard(self.shard_idx).into_iter();
      self.shard_idx += 1;
    }
  }
}
