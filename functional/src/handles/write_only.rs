use super::Facade;

use crate::dispatch::Completion;
use crate::listener::WriteListeners;
use crate::map::Status;
use crate::metrics::MetricsSnapshot;
use crate::params::{AccessMode, Param, Params};
use crate::shared::Shared;
use crate::traversable::CloseableIterator;
use crate::view::{Done, WriteEntryView};

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A write-only façade over a [`FunctionalMap`](crate::FunctionalMap).
///
/// Callbacks receive a [`WriteEntryView`], which can set or remove the entry
/// but cannot observe it. Every mutation is reported to write listeners.
pub struct WriteOnlyMap<K, V, H = ahash::RandomState> {
  facade: Facade<K, V, H>,
}

impl<K, V, H> Clone for WriteOnlyMap<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      facade: self.facade.clone(),
    }
  }
}

impl<K, V, H> fmt::Debug for WriteOnlyMap<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("WriteOnlyMap").field(&self.facade).finish()
  }
}

impl<K, V, H> WriteOnlyMap<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(core: Arc<Shared<K, V, H>>) -> Self {
    Self {
      facade: Facade::new(core, AccessMode::WriteOnly),
    }
  }

  fn view(&self, key: K) -> WriteEntryView<K, V, H> {
    WriteEntryView::new(key, Arc::clone(&self.facade.core), self.facade.params().lifespan())
  }

  /// Applies `f` to a write view of `key`'s entry.
  pub fn eval<R, F>(&self, key: K, f: F) -> Completion<R>
  where
    F: FnOnce(&WriteEntryView<K, V, H>) -> R + Send + 'static,
    R: Send + 'static,
  {
    self.facade.trace("eval");
    let view = self.view(key);
    self.facade.submit(move || f(&view))
  }

  /// Applies `f` to `value` and a write view of `key`'s entry. Useful when
  /// the callback is reused with different values.
  pub fn eval_with<R, F>(&self, key: K, value: V, f: F) -> Completion<R>
  where
    F: FnOnce(V, &WriteEntryView<K, V, H>) -> R + Send + 'static,
    R: Send + 'static,
  {
    self.facade.trace("eval_with");
    let view = self.view(key);
    self.facade.submit(move || f(value, &view))
  }

  /// Applies `f` to a write view of each key.
  ///
  /// With the blocking wait mode every write happens before this returns.
  /// With the non-blocking wait mode the writes happen as the returned
  /// iterator is pulled, and whatever is left runs when it is dropped.
  /// Only [`close`](CloseableIterator::close) skips the remaining keys.
  pub fn eval_many<'a, I, F>(&self, keys: I, mut f: F) -> CloseableIterator<'a, Done>
  where
    I: IntoIterator<Item = K>,
    I::IntoIter: 'a,
    F: FnMut(&WriteEntryView<K, V, H>) + 'a,
  {
    self.facade.trace("eval_many");
    let this = self.clone();
    self.facade.bulk_writes(keys.into_iter().map(move |key| {
      f(&this.view(key));
      Done
    }))
  }

  /// Applies `f` to each value and a write view of its key. Evaluated like
  /// [`eval_many`](Self::eval_many).
  pub fn eval_many_entries<'a, I, F>(&self, entries: I, mut f: F) -> CloseableIterator<'a, Done>
  where
    I: IntoIterator<Item = (K, V)>,
    I::IntoIter: 'a,
    F: FnMut(V, &WriteEntryView<K, V, H>) + 'a,
  {
    self.facade.trace("eval_many_entries");
    let this = self.clone();
    self.facade.bulk_writes(entries.into_iter().map(move |(key, value)| {
      f(value, &this.view(key));
      Done
    }))
  }

  /// A write view for every key currently in the map.
  pub fn values(&self) -> CloseableIterator<'static, WriteEntryView<K, V, H>> {
    self.facade.trace("values");
    let this = self.clone();
    self
      .facade
      .closeable(self.facade.snapshot().map(move |(key, _)| this.view(key)))
  }

  /// Removes every entry. Listeners are not notified.
  pub fn truncate(&self) -> Completion<Done> {
    self.facade.truncate()
  }

  /// The map's write listener registry.
  pub fn listeners(&self) -> WriteListeners<K, V> {
    WriteListeners::new(Arc::clone(&self.facade.core.notifier))
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
