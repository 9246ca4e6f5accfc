use crate::params::{DefaultLifespan, Param, StreamMode, StreamModes, WaitMode};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine configuration that can be loaded from a file.
///
/// With the `serde` feature the struct deserializes from any serde format;
/// missing fields take their defaults.
///
/// ```json
/// { "shards": 16, "wait_mode": "blocking", "stream_mode": ["keys", "values"], "lifespan_ms": 60000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct FunctionalMapConfig {
  /// Number of store shards, rounded up to a power of two. `None` picks a
  /// value from the number of CPUs.
  pub shards: Option<usize>,
  pub wait_mode: WaitMode,
  /// Which parts of each entry store-wide traversals expose.
  pub stream_mode: Vec<StreamModes>,
  /// Lifespan attached to entries written without one.
  pub lifespan_ms: Option<u64>,
}

impl Default for FunctionalMapConfig {
  fn default() -> Self {
    Self {
      shards: None,
      wait_mode: WaitMode::default(),
      stream_mode: vec![StreamModes::Keys],
      lifespan_ms: None,
    }
  }
}

impl FunctionalMapConfig {
  /// The params this configuration sets.
  pub fn params(&self) -> [Param; 3] {
    [
      Param::WaitMode(self.wait_mode),
      Param::StreamMode(StreamMode::of(&self.stream_mode)),
      Param::Lifespan(DefaultLifespan(self.lifespan_ms)),
    ]
  }
}
