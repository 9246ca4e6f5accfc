#![allow(dead_code)]

use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;

use fibre_functional::{FunctionalMap, FunctionalMapBuilder, ThreadExecutor, WaitMode};

// A hasher that uses the integer value of the key as its hash, so tests can
// reason about which shard a key lands in.
#[derive(Clone, Default)]
pub struct ShardControllingHasher;
impl BuildHasher for ShardControllingHasher {
  type Hasher = TestHasher;
  fn build_hasher(&self) -> Self::Hasher {
    TestHasher(0)
  }
}
pub struct TestHasher(u64);
impl Hasher for TestHasher {
  fn finish(&self) -> u64 {
    self.0
  }
  fn write(&mut self, bytes: &[u8]) {
    for b in bytes {
      self.0 = self.0.wrapping_mul(31).wrapping_add(*b as u64);
    }
  }
  fn write_i32(&mut self, i: i32) {
    self.0 = i as u64;
  }
}

/// A map whose façades compute every result on the calling thread.
pub fn blocking_map() -> FunctionalMap<i32, String> {
  FunctionalMap::builder()
    .wait_mode(WaitMode::Blocking)
    .build()
    .unwrap()
}

/// A map whose façades schedule work on dedicated threads.
pub fn non_blocking_map() -> FunctionalMap<i32, String> {
  FunctionalMap::builder()
    .wait_mode(WaitMode::NonBlocking)
    .executor(Arc::new(ThreadExecutor))
    .build()
    .unwrap()
}

/// Both flavours, for tests that must hold in either wait mode.
pub fn maps() -> Vec<FunctionalMap<i32, String>> {
  vec![blocking_map(), non_blocking_map()]
}

pub fn build_sharded_map(shards: usize) -> FunctionalMap<i32, String, ShardControllingHasher> {
  FunctionalMapBuilder::new()
    .shards(shards)
    .hasher(ShardControllingHasher)
    .wait_mode(WaitMode::Blocking)
    .build()
    .unwrap()
}

/// Installs a `tracing` subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}
