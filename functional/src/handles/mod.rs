//! The three capability-scoped façades over a [`FunctionalMap`](crate::FunctionalMap).

mod read_only;
mod read_write;
mod write_only;

pub use read_only::ReadOnlyMap;
pub use read_write::ReadWriteMap;
pub use write_only::WriteOnlyMap;

use crate::dispatch::{self, Completion, Dispatcher, Evaluation};
use crate::entry::InternalEntry;
use crate::error::{Error, Result};
use crate::map::Status;
use crate::metrics::MetricsSnapshot;
use crate::pair::Pair;
use crate::params::{AccessMode, Param, ParamId, Params, StreamMode, StreamModes};
use crate::shared::Shared;
use crate::traversable::{CloseableIterator, Traversable};
use crate::view::Done;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// State common to every façade: the shared core, the façade's own params and
/// the dispatcher selected from its wait mode.
pub(crate) struct Facade<K, V, H> {
  pub(crate) core: Arc<Shared<K, V, H>>,
  params: Params,
  dispatcher: Arc<dyn Dispatcher>,
}

impl<K, V, H> Clone for Facade<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      core: Arc::clone(&self.core),
      params: self.params,
      dispatcher: Arc::clone(&self.dispatcher),
    }
  }
}

impl<K, V, H> fmt::Debug for Facade<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Facade")
      .field("params", &self.params)
      .field("dispatcher", &self.dispatcher)
      .finish_non_exhaustive()
  }
}

impl<K, V, H> Facade<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Builds a façade with `access`, inheriting the map's default params.
  pub(crate) fn new(core: Arc<Shared<K, V, H>>, access: AccessMode) -> Self {
    let params = core.defaults.add_all(&[access.into()]);
    let dispatcher = dispatch::for_wait_mode(params.wait_mode(), &core.executor);
    Self {
      core,
      params,
      dispatcher,
    }
  }

  /// A façade over the same core with `ps` merged into its params.
  ///
  /// The access mode belongs to the façade type, so an `AccessMode` among
  /// `ps` is ignored.
  pub(crate) fn with_params(&self, ps: &[Param]) -> Self {
    if self.params.contains_all(ps) {
      return self.clone();
    }

    let access = self.params.access_mode();
    if ps.iter().any(|p| p.id() == ParamId::AccessMode && *p != Param::AccessMode(access)) {
      tracing::debug!(?access, "access mode is fixed by the façade type; override ignored");
    }
    let params = self.params.add_all(ps).add_all(&[access.into()]);

    let dispatcher = if params.wait_mode() == self.params.wait_mode() {
      Arc::clone(&self.dispatcher)
    } else {
      dispatch::for_wait_mode(params.wait_mode(), &self.core.executor)
    };
    Self {
      core: Arc::clone(&self.core),
      params,
      dispatcher,
    }
  }

  #[inline]
  pub(crate) fn params(&self) -> Params {
    self.params
  }

  #[inline]
  pub(crate) fn trace(&self, op: &'static str) {
    tracing::trace!(
      facade = ?self.params.access_mode(),
      op,
      wait_mode = ?self.params.wait_mode(),
      status = ?self.core.status(),
      "façade operation"
    );
  }

  /// Runs `work` according to the façade's wait mode.
  pub(crate) fn submit<T, F>(&self, work: F) -> Completion<T>
  where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
  {
    dispatch::submit(&*self.dispatcher, work)
  }

  pub(crate) fn traversable<'a, T: 'a, I>(&self, results: I) -> Traversable<'a, T>
  where
    I: Iterator<Item = T> + 'a,
  {
    match self.dispatcher.evaluation() {
      Evaluation::Eager => Traversable::eager(results),
      Evaluation::Lazy => Traversable::new(results),
    }
  }

  pub(crate) fn closeable<'a, T: 'a, I>(&self, results: I) -> CloseableIterator<'a, T>
  where
    I: Iterator<Item = T> + 'a,
  {
    match self.dispatcher.evaluation() {
      Evaluation::Eager => CloseableIterator::eager(results),
      Evaluation::Lazy => CloseableIterator::new(results),
    }
  }

  /// Completion markers of bulk writes. Lazily evaluated writes still run to
  /// the end if the iterator is dropped without being closed.
  pub(crate) fn bulk_writes<'a, I>(&self, writes: I) -> CloseableIterator<'a, Done>
  where
    I: Iterator<Item = Done> + 'a,
  {
    match self.dispatcher.evaluation() {
      Evaluation::Eager => CloseableIterator::eager(writes),
      Evaluation::Lazy => CloseableIterator::draining(writes),
    }
  }

  /// Every stored key, from a shard-by-shard snapshot of the store.
  pub(crate) fn snapshot(&self) -> impl Iterator<Item = (K, Arc<InternalEntry<V>>)> + 'static {
    self.core.store.snapshot_iter()
  }

  /// The façade's stream mode, rejecting the empty set.
  pub(crate) fn stream_mode(&self) -> Result<StreamMode> {
    let mode = self.params.stream_mode();
    if mode.is_empty() {
      return Err(Error::IllegalState(format!(
        "stream mode {:?} selects neither keys nor values",
        mode
      )));
    }
    Ok(mode)
  }

  pub(crate) fn truncate(&self) -> Completion<Done> {
    self.trace("truncate");
    let core = Arc::clone(&self.core);
    self.submit(move || {
      core.truncate();
      Done
    })
  }

  pub(crate) fn status(&self) -> Status {
    self.core.status()
  }

  pub(crate) fn close(&self) {
    self.core.close();
  }

  pub(crate) fn metrics(&self) -> MetricsSnapshot {
    self.core.metrics.snapshot()
  }
}

/// Shapes a stored entry into a [`Pair`] according to `mode`. `mode` must be
/// non-empty.
pub(crate) fn pair_of<K, V>(mode: StreamMode, key: K, entry: &InternalEntry<V>) -> Pair<K, V> {
  match (mode.contains(StreamModes::Keys), mode.contains(StreamModes::Values)) {
    (true, true) => Pair::Both(key, entry.value()),
    (true, false) => Pair::Key(key),
    _ => Pair::Value(entry.value()),
  }
}
