//! Entry views.
//!
//! A view is a transient, per-call handle on a single key. Its capabilities
//! come from small traits: [`ReadEntry`] for reading, [`WriteEntry`] for
//! writing. Each façade builds exactly one concrete view type, so a
//! read-only map can never hand out something that writes.

use crate::entry::InternalEntry;
use crate::error::{Error, Result};
use crate::meta::{MetaParam, MetaParamLookup, MetaParams, Writable};
use crate::params::DefaultLifespan;
use crate::shared::Shared;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// The no-information marker returned by writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Done;

/// Read access to one entry.
pub trait ReadEntry<K, V>: MetaParamLookup {
  fn key(&self) -> &K;

  /// The value, or `None` when the key is absent. Never fails.
  fn find(&self) -> Option<Arc<V>>;

  /// The value.
  ///
  /// # Errors
  /// `Error::NotFound` when the key is absent.
  fn get(&self) -> Result<Arc<V>>;
}

/// Write access to one entry.
pub trait WriteEntry<V> {
  /// Sets the value, creating the entry if absent. `metas` are merged over
  /// the metadata the entry already had.
  fn set<I>(&self, value: V, metas: I) -> Done
  where
    I: IntoIterator<Item = Writable>;

  /// Removes the entry.
  fn remove(&self) -> Done;
}

fn not_found<K: fmt::Debug>(key: &K) -> Error {
  Error::NotFound(format!("no value for key {:?}", key))
}

/// An immutable snapshot of one entry.
///
/// Handed to read-only callbacks and to listeners. The snapshot is taken
/// when the view is built and never changes afterwards.
pub struct ReadEntryView<K, V> {
  key: K,
  entry: Option<Arc<InternalEntry<V>>>,
}

impl<K, V> ReadEntryView<K, V> {
  pub(crate) fn new(key: K, entry: Option<Arc<InternalEntry<V>>>) -> Self {
    Self { key, entry }
  }

  #[cfg(test)]
  pub(crate) fn absent(key: K) -> Self {
    Self::new(key, None)
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  pub fn find(&self) -> Option<Arc<V>> {
    self.entry.as_ref().map(|e| e.value())
  }

  /// Returns `true` if the snapshot holds a value.
  pub fn is_present(&self) -> bool {
    self.entry.is_some()
  }

  /// All metadata of the entry; empty when absent.
  pub fn meta_params(&self) -> MetaParams {
    self.entry.as_ref().map(|e| e.metas.clone()).unwrap_or_default()
  }

  /// Consumes the view, returning the key and value.
  pub fn into_parts(self) -> (K, Option<Arc<V>>) {
    let value = self.find();
    (self.key, value)
  }
}

impl<K: fmt::Debug, V> ReadEntryView<K, V> {
  /// # Errors
  /// `Error::NotFound` when the key is absent.
  pub fn get(&self) -> Result<Arc<V>> {
    self.find().ok_or_else(|| not_found(&self.key))
  }
}

impl<K, V> MetaParamLookup for ReadEntryView<K, V> {
  fn find_meta_param<M: MetaParam>(&self) -> Option<M> {
    self.entry.as_ref().and_then(|e| e.find_meta_param::<M>())
  }
}

impl<K: fmt::Debug, V> ReadEntry<K, V> for ReadEntryView<K, V> {
  fn key(&self) -> &K {
    &self.key
  }

  fn find(&self) -> Option<Arc<V>> {
    ReadEntryView::find(self)
  }

  fn get(&self) -> Result<Arc<V>> {
    ReadEntryView::get(self)
  }
}

impl<K: Clone, V> Clone for ReadEntryView<K, V> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      entry: self.entry.clone(),
    }
  }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ReadEntryView<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReadEntryView")
      .field("key", &self.key)
      .field("value", &self.entry.as_ref().map(|e| &e.value))
      .field("metas", &self.entry.as_ref().map(|e| &e.metas))
      .finish()
  }
}

/// A write-only view of one entry.
///
/// Every `set` and `remove` is reported to write listeners as `on_write`.
pub struct WriteEntryView<K, V, H = ahash::RandomState> {
  key: K,
  core: Arc<Shared<K, V, H>>,
  lifespan: DefaultLifespan,
}

impl<K, V, H> WriteEntryView<K, V, H> {
  pub(crate) fn new(key: K, core: Arc<Shared<K, V, H>>, lifespan: DefaultLifespan) -> Self {
    Self { key, core, lifespan }
  }

  pub fn key(&self) -> &K {
    &self.key
  }
}

impl<K, V, H> WriteEntry<V> for WriteEntryView<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  fn set<I>(&self, value: V, metas: I) -> Done
  where
    I: IntoIterator<Item = Writable>,
  {
    let transition = self.core.put(&self.key, value, metas, self.lifespan);
    self.core.notify_write(&self.key, &transition);
    Done
  }

  fn remove(&self) -> Done {
    let transition = self.core.remove(&self.key);
    self.core.notify_write(&self.key, &transition);
    Done
  }
}

impl<K: fmt::Debug, V, H> fmt::Debug for WriteEntryView<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WriteEntryView").field("key", &self.key).finish_non_exhaustive()
  }
}

/// A read-write view of one entry.
///
/// Reads always observe the entry as it is in the store at the time of the
/// call, so a `find` after a `set` in the same callback sees the new value.
/// Mutations are reported to read-write listeners as create, modify or
/// remove events.
pub struct ReadWriteEntryView<K, V, H = ahash::RandomState> {
  key: K,
  core: Arc<Shared<K, V, H>>,
  lifespan: DefaultLifespan,
}

impl<K, V, H> ReadWriteEntryView<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(key: K, core: Arc<Shared<K, V, H>>, lifespan: DefaultLifespan) -> Self {
    Self { key, core, lifespan }
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  pub fn find(&self) -> Option<Arc<V>> {
    self.core.peek(&self.key).map(|e| e.value())
  }

  /// A snapshot of the entry as it is now.
  pub fn snapshot(&self) -> ReadEntryView<K, V> {
    self.core.read(self.key.clone())
  }

  /// Atomically replaces the entry if `predicate` accepts its current state.
  ///
  /// The check and the write happen under the same shard lock, so no other
  /// write to the key can slip in between. Returns whether the value was
  /// written. `predicate` must not call back into the map.
  pub fn set_if<P, I>(&self, predicate: P, value: V, metas: I) -> bool
  where
    P: FnOnce(&ReadEntryView<K, V>) -> bool,
    I: IntoIterator<Item = Writable>,
  {
    let transition = self.core.put_if(&self.key, predicate, value, metas, self.lifespan);
    self.core.notify_read_write(&self.key, &transition);
    transition.is_changed()
  }
}

impl<K, V, H> ReadWriteEntryView<K, V, H>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// # Errors
  /// `Error::NotFound` when the key is absent.
  pub fn get(&self) -> Result<Arc<V>> {
    self.find().ok_or_else(|| not_found(&self.key))
  }
}

impl<K, V, H> MetaParamLookup for ReadWriteEntryView<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  fn find_meta_param<M: MetaParam>(&self) -> Option<M> {
    self.core.peek(&self.key).and_then(|e| e.find_meta_param::<M>())
  }
}

impl<K, V, H> ReadEntry<K, V> for ReadWriteEntryView<K, V, H>
where
  K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  fn key(&self) -> &K {
    &self.key
  }

  fn find(&self) -> Option<Arc<V>> {
    ReadWriteEntryView::find(self)
  }

  fn get(&self) -> Result<Arc<V>> {
    ReadWriteEntryView::get(self)
  }
}

impl<K, V, H> WriteEntry<V> for ReadWriteEntryView<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  fn set<I>(&self, value: V, metas: I) -> Done
  where
    I: IntoIterator<Item = Writable>,
  {
    let transition = self.core.put(&self.key, value, metas, self.lifespan);
    self.core.notify_read_write(&self.key, &transition);
    Done
  }

  fn remove(&self) -> Done {
    let transition = self.core.remove(&self.key);
    self.core.notify_read_write(&self.key, &transition);
    Done
  }
}

impl<K: fmt::Debug, V, H> fmt::Debug for ReadWriteEntryView<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReadWriteEntryView").field("key", &self.key).finish_non_exhaustive()
  }
}
