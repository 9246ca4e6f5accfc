use crate::builder::FunctionalMapBuilder;
use crate::handles::{ReadOnlyMap, ReadWriteMap, WriteOnlyMap};
use crate::metrics::MetricsSnapshot;
use crate::params::Params;
use crate::shared::Shared;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Lifecycle state of a map, shared by all of its façades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
  Started,
  Stopped,
}

/// An in-memory key/value store accessed through capability-scoped façades.
///
/// `FunctionalMap` owns the store and the listener registry. It exposes no
/// data operations of its own; obtain a [`ReadOnlyMap`], [`WriteOnlyMap`] or
/// [`ReadWriteMap`] instead. Every façade derived from one map shares the
/// same entries, listeners, metrics and status.
pub struct FunctionalMap<K, V, H = ahash::RandomState> {
  pub(crate) core: Arc<Shared<K, V, H>>,
}

impl<K, V, H> Clone for FunctionalMap<K, V, H> {
  fn clone(&self) -> Self {
    Self {
      core: Arc::clone(&self.core),
    }
  }
}

impl<K, V, H> fmt::Debug for FunctionalMap<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FunctionalMap").field("core", &self.core).finish()
  }
}

impl<K, V> FunctionalMap<K, V, ahash::RandomState>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// A map with the default configuration.
  pub fn new() -> Self {
    Self::builder().build_default()
  }

  pub fn builder() -> FunctionalMapBuilder<K, V> {
    FunctionalMapBuilder::new()
  }
}

impl<K, V> Default for FunctionalMap<K, V, ahash::RandomState>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, H> FunctionalMap<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn from_shared(core: Arc<Shared<K, V, H>>) -> Self {
    Self { core }
  }

  pub fn read_only(&self) -> ReadOnlyMap<K, V, H> {
    ReadOnlyMap::new(Arc::clone(&self.core))
  }

  pub fn write_only(&self) -> WriteOnlyMap<K, V, H> {
    WriteOnlyMap::new(Arc::clone(&self.core))
  }

  pub fn read_write(&self) -> ReadWriteMap<K, V, H> {
    ReadWriteMap::new(Arc::clone(&self.core))
  }

  /// The params every new façade starts from.
  pub fn params(&self) -> Params {
    self.core.defaults
  }

  pub fn status(&self) -> Status {
    self.core.status()
  }

  /// Marks the map [`Status::Stopped`] for every façade. Idempotent.
  pub fn close(&self) {
    self.core.close();
  }

  /// The number of entries currently stored.
  pub fn len(&self) -> usize {
    self.core.store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.core.metrics.snapshot()
  }
}
