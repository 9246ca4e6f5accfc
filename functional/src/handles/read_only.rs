use super::{pair_of, Facade};

use crate::dispatch::Completion;
use crate::error::Result;
use crate::map::Status;
use crate::metrics::MetricsSnapshot;
use crate::pair::Pair;
use crate::params::{AccessMode, Param, Params};
use crate::shared::Shared;
use crate::traversable::Traversable;
use crate::view::ReadEntryView;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// A read-only façade over a [`FunctionalMap`](crate::FunctionalMap).
///
/// Callbacks receive a [`ReadEntryView`], an immutable snapshot of the entry
/// taken when the callback runs. Nothing reachable from this type can write.
pub struct ReadOnlyMap<K, V, H = ahash::RandomState> {
  facade: Facade<K, V, H>,
}

impl<K, V, H> Clone for ReadOnlyMap<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      facade: self.facade.clone(),
    }
  }
}

impl<K, V, H> fmt::Debug for ReadOnlyMap<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ReadOnlyMap").field(&self.facade).finish()
  }
}

impl<K, V, H> ReadOnlyMap<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(core: Arc<Shared<K, V, H>>) -> Self {
    Self {
      facade: Facade::new(core, AccessMode::ReadOnly),
    }
  }

  /// Applies `f` to a view of `key`'s entry.
  pub fn eval<R, F>(&self, key: K, f: F) -> Completion<R>
  where
    F: FnOnce(&ReadEntryView<K, V>) -> R + Send + 'static,
    R: Send + 'static,
  {
    self.facade.trace("eval");
    let core = Arc::clone(&self.facade.core);
    self.facade.submit(move || f(&core.read(key)))
  }

  /// Applies `f` to a view of each key, yielding one result per key.
  pub fn eval_many<'a, I, R, F>(&self, keys: I, mut f: F) -> Traversable<'a, R>
  where
    I: IntoIterator<Item = K>,
    I::IntoIter: 'a,
    F: FnMut(&ReadEntryView<K, V>) -> R + 'a,
    R: 'a,
  {
    self.facade.trace("eval_many");
    let core = Arc::clone(&self.facade.core);
    self
      .facade
      .traversable(keys.into_iter().map(move |key| f(&core.read(key))))
  }

  /// Every key in the map.
  pub fn keys(&self) -> Traversable<'static, K> {
    self.facade.trace("keys");
    self.facade.traversable(self.facade.snapshot().map(|(key, _)| key))
  }

  /// A view of every entry in the map.
  pub fn entries(&self) -> Traversable<'static, ReadEntryView<K, V>> {
    self.facade.trace("entries");
    let core = Arc::clone(&self.facade.core);
    self
      .facade
      .traversable(self.facade.snapshot().map(move |(key, entry)| core.view_of(key, entry)))
  }

  /// Every value in the map.
  pub fn values(&self) -> Traversable<'static, Arc<V>> {
    self.facade.trace("values");
    self
      .facade
      .traversable(self.facade.snapshot().map(|(_, entry)| entry.value()))
  }

  /// Returns the first `Some` produced by `f` over the map's entries, shaped
  /// by the façade's stream mode.
  ///
  /// # Errors
  /// `Error::IllegalState` if the stream mode selects neither keys nor values.
  pub fn find_any<T, F>(&self, f: F) -> Result<Completion<Option<T>>>
  where
    F: FnMut(Pair<K, V>) -> Option<T> + Send + 'static,
    T: Send + 'static,
  {
    self.facade.trace("find_any");
    let mode = self.facade.stream_mode()?;
    let entries = self.facade.snapshot();
    Ok(self.facade.submit(move || {
      entries
        .map(|(key, entry)| pair_of(mode, key, &entry))
        .find_map(f)
    }))
  }

  /// Folds `f` over the map's entries, shaped by the façade's stream mode,
  /// starting from `z`.
  ///
  /// # Errors
  /// `Error::IllegalState` if the stream mode selects neither keys nor values.
  pub fn reduce<T, F>(&self, z: T, mut f: F) -> Result<Completion<T>>
  where
    F: FnMut(Pair<K, V>, T) -> T + Send + 'static,
    T: Send + 'static,
  {
    self.facade.trace("reduce");
    let mode = self.facade.stream_mode()?;
    let entries = self.facade.snapshot();
    Ok(self.facade.submit(move || {
      entries.fold(z, |acc, (key, entry)| f(pair_of(mode, key, &entry), acc))
    }))
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
