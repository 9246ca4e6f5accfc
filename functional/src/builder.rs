use crate::config::FunctionalMapConfig;
use crate::error::{Error, Result};
use crate::executor::{self, Executor};
use crate::map::FunctionalMap;
use crate::params::{DefaultLifespan, Param, Params, StreamMode, WaitMode};
use crate::shared::Shared;
use crate::store::ShardedStore;

use core::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;

/// A builder for [`FunctionalMap`] instances.
pub struct FunctionalMapBuilder<K, V, H = ahash::RandomState> {
  shards: usize,
  hasher: H,
  params: Params,
  executor: Option<Arc<dyn Executor>>,
  _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, H> fmt::Debug for FunctionalMapBuilder<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FunctionalMapBuilder")
      .field("shards", &self.shards)
      .field("params", &self.params)
      .field("has_executor", &self.executor.is_some())
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
impl<K, V, H> FunctionalMapBuilder<K, V, H> {
  /// Sets the number of concurrent shards. Rounded up to a power of two when
  /// the map is built; zero is rejected by [`build`](Self::build).
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = shards;
    self
  }

  /// Merges `ps` into the params every façade of the map starts from.
  pub fn params(mut self, ps: &[Param]) -> Self {
    self.params = self.params.add_all(ps);
    self
  }

  pub fn wait_mode(self, mode: WaitMode) -> Self {
    self.params(&[mode.into()])
  }

  pub fn stream_mode(self, mode: StreamMode) -> Self {
    self.params(&[mode.into()])
  }

  /// Attaches a `Lifespan` of `ms` milliseconds to entries written without one.
  pub fn default_lifespan(self, ms: u64) -> Self {
    self.params(&[DefaultLifespan(Some(ms)).into()])
  }

  /// Sets the executor used by non-blocking façades.
  ///
  /// By default a process-wide executor is used: rayon's global pool with the
  /// `rayon` feature, otherwise a thread per operation.
  pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
    self.executor = Some(executor);
    self
  }

  /// Applies every setting of `config`.
  pub fn from_config(mut self, config: &FunctionalMapConfig) -> Self {
    if let Some(shards) = config.shards {
      self.shards = shards;
    }
    self.params(&config.params())
  }
}

// --- Default Constructor ---
impl<K, V, H: BuildHasher + Default> FunctionalMapBuilder<K, V, H> {
  /// Creates a new builder with default settings.
  pub fn new() -> Self {
    Self {
      shards: (num_cpus::get() * 4).max(1).next_power_of_two(),
      hasher: H::default(),
      params: Params::new(),
      executor: None,
      _marker: PhantomData,
    }
  }
}

impl<K, V> Default for FunctionalMapBuilder<K, V, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<K, V, H> FunctionalMapBuilder<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  /// Sets the hasher for the store.
  pub fn hasher(mut self, hasher: H) -> Self {
    self.hasher = hasher;
    self
  }

  /// Builds the map.
  ///
  /// # Errors
  /// `Error::Config` if the configuration is invalid.
  pub fn build(self) -> Result<FunctionalMap<K, V, H>> {
    self.validate()?;
    Ok(self.assemble())
  }

  /// Builds from settings that are known to be valid.
  pub(crate) fn build_default(self) -> FunctionalMap<K, V, H> {
    self.assemble()
  }

  fn assemble(self) -> FunctionalMap<K, V, H> {
    let shards = self.shards.max(1).next_power_of_two();
    let executor = self.executor.unwrap_or_else(executor::default_executor);
    tracing::debug!(shards, params = ?self.params, "building functional map");

    let store = ShardedStore::new(shards, self.hasher);
    FunctionalMap::from_shared(Arc::new(Shared::new(store, executor, self.params)))
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<()> {
    if self.shards == 0 {
      return Err(Error::Config("shards must be greater than zero".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::params::AccessMode;

  #[test]
  fn zero_shards_is_rejected() {
    let err = FunctionalMapBuilder::<u32, u32>::new().shards(0).build().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn shards_round_up_to_power_of_two() {
    let map = FunctionalMapBuilder::<u32, u32>::new().shards(5).build().unwrap();
    assert_eq!(map.core.store.num_shards(), 8);
  }

  #[test]
  fn params_become_facade_defaults() {
    let map = FunctionalMapBuilder::<u32, u32>::new()
      .wait_mode(WaitMode::Blocking)
      .default_lifespan(250)
      .build()
      .unwrap();

    let rw = map.read_write();
    assert_eq!(rw.params().wait_mode(), WaitMode::Blocking);
    assert_eq!(rw.params().lifespan(), DefaultLifespan(Some(250)));
    assert_eq!(rw.params().access_mode(), AccessMode::ReadWrite);
    assert_eq!(map.read_only().params().access_mode(), AccessMode::ReadOnly);
  }

  #[test]
  fn from_config_overrides_settings() {
    let config = FunctionalMapConfig {
      shards: Some(2),
      wait_mode: WaitMode::Blocking,
      stream_mode: vec![crate::params::StreamModes::Values],
      lifespan_ms: Some(10),
    };
    let map = FunctionalMapBuilder::<u32, u32>::new().from_config(&config).build().unwrap();
    assert_eq!(map.core.store.num_shards(), 2);
    assert_eq!(map.params().stream_mode(), StreamMode::VALUES);
    assert_eq!(map.params().wait_mode(), WaitMode::Blocking);
  }
}
