use super::Facade;

use crate::dispatch::Completion;
use crate::listener::ReadWriteListeners;
use crate::map::Status;
use crate::metrics::MetricsSnapshot;
use crate::params::{AccessMode, Param, Params};
use crate::shared::Shared;
use crate::traversable::Traversable;
use crate::view::{Done, ReadWriteEntryView};

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A read-write façade over a [`FunctionalMap`](crate::FunctionalMap).
///
/// Callbacks receive a [`ReadWriteEntryView`]. Mutations are classified and
/// reported to read-write listeners as create, modify or remove events.
pub struct ReadWriteMap<K, V, H = ahash::RandomState> {
  facade: Facade<K, V, H>,
}

impl<K, V, H> Clone for ReadWriteMap<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      facade: self.facade.clone(),
    }
  }
}

impl<K, V, H> fmt::Debug for ReadWriteMap<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ReadWriteMap").field(&self.facade).finish()
  }
}

impl<K, V, H> ReadWriteMap<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(core: Arc<Shared<K, V, H>>) -> Self {
    Self {
      facade: Facade::new(core, AccessMode::ReadWrite),
    }
  }

  fn view(&self, key: K) -> ReadWriteEntryView<K, V, H> {
    ReadWriteEntryView::new(key, Arc::clone(&self.facade.core), self.facade.params().lifespan())
  }

  /// Applies `f` to a read-write view of `key`'s entry.
  pub fn eval<R, F>(&self, key: K, f: F) -> Completion<R>
  where
    F: FnOnce(&ReadWriteEntryView<K, V, H>) -> R + Send + 'static,
    R: Send + 'static,
  {
    self.facade.trace("eval");
    let view = self.view(key);
    self.facade.submit(move || f(&view))
  }

  /// Applies `f` to `value` and a read-write view of `key`'s entry.
  pub fn eval_with<R, F>(&self, key: K, value: V, f: F) -> Completion<R>
  where
    F: FnOnce(V, &ReadWriteEntryView<K, V, H>) -> R + Send + 'static,
    R: Send + 'static,
  {
    self.facade.trace("eval_with");
    let view = self.view(key);
    self.facade.submit(move || f(value, &view))
  }

  /// Applies `f` to a read-write view of each key, yielding one result per key.
  pub fn eval_many<'a, I, R, F>(&self, keys: I, mut f: F) -> Traversable<'a, R>
  where
    I: IntoIterator<Item = K>,
    I::IntoIter: 'a,
    F: FnMut(&ReadWriteEntryView<K, V, H>) -> R + 'a,
    R: 'a,
  {
    self.facade.trace("eval_many");
    let this = self.clone();
    self
      .facade
      .traversable(keys.into_iter().map(move |key| f(&this.view(key))))
  }

  /// Applies `f` to each value and a read-write view of its key, yielding one
  /// result per entry.
  pub fn eval_many_entries<'a, I, R, F>(&self, entries: I, mut f: F) -> Traversable<'a, R>
  where
    I: IntoIterator<Item = (K, V)>,
    I::IntoIter: 'a,
    F: FnMut(V, &ReadWriteEntryView<K, V, H>) -> R + 'a,
    R: 'a,
  {
    self.facade.trace("eval_many_entries");
    let this = self.clone();
    self
      .facade
      .traversable(entries.into_iter().map(move |(key, value)| f(value, &this.view(key))))
  }

  /// A read-write view for every key currently in the map.
  pub fn entries(&self) -> Traversable<'static, ReadWriteEntryView<K, V, H>> {
    self.facade.trace("entries");
    let this = self.clone();
    self
      .facade
      .traversable(self.facade.snapshot().map(move |(key, _)| this.view(key)))
  }

  /// Removes every entry. Listeners are not notified.
  pub fn truncate(&self) -> Completion<Done> {
    self.facade.truncate()
  }

  /// The map's listener registry.
  pub fn listeners(&self) -> ReadWriteListeners<K, V> {
    ReadWriteListeners::new(Arc::clone(&self.facade.core.notifier))
  }

  /// A façade over the same map with `ps` merged into its params. Never
  /// changes the receiver.
  pub fn with_params(&self, ps: &[Param]) -> Self {
    Self {
      facade: self.facade.with_params(ps),
    }
  }

  pub fn params(&self) -> Params {
    self.facade.params()
  }

  pub fn status(&self) -> Status {
    self.facade.status()
  }

  /// Stops the underlying map, for every façade that shares it.
  pub fn close(&self) {
    self.facade.close()
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.facade.metrics()
  }
}
