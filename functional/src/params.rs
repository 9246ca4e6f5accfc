//! Execution-time parameters.
//!
//! A [`Param`] tunes *how* an operation runs (access mode, wait mode, stream
//! mode, default lifespan). Params are never stored with an entry; that is the
//! job of [`MetaParam`](crate::meta::MetaParam). The catalog is closed: every
//! parameter kind owns a fixed slot, identified by its [`ParamId`], inside an
//! immutable [`Params`] array.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The fixed slot of each parameter kind inside [`Params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum ParamId {
  AccessMode = 0,
  StreamMode = 1,
  WaitMode = 2,
  Lifespan = 3,
}

impl ParamId {
  /// Number of parameter kinds in the catalog.
  pub const COUNT: usize = 4;

  #[inline]
  pub const fn index(self) -> usize {
    self as usize
  }
}

/// Which capability an operation runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AccessMode {
  #[default]
  ReadOnly,
  ReadWrite,
  WriteOnly,
}

impl AccessMode {
  /// Returns `true` for the modes that may mutate the store.
  pub fn is_write(self) -> bool {
    matches!(self, AccessMode::ReadWrite | AccessMode::WriteOnly)
  }
}

/// Whether the result of an operation is computed on the caller's thread
/// (`Blocking`) or scheduled on the executor (`NonBlocking`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WaitMode {
  Blocking,
  #[default]
  NonBlocking,
}

/// A single element of a [`StreamMode`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StreamModes {
  Keys,
  Values,
}

/// The subset of `{Keys, Values}` that store-wide traversals should expose.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamMode {
  keys: bool,
  values: bool,
}

impl StreamMode {
  pub const KEYS: StreamMode = StreamMode { keys: true, values: false };
  pub const VALUES: StreamMode = StreamMode { keys: false, values: true };
  pub const KEYS_AND_VALUES: StreamMode = StreamMode { keys: true, values: true };

  /// Builds a stream mode from any combination of modes. An empty slice
  /// yields an empty set, which traversals reject as an illegal state.
  pub fn of(modes: &[StreamModes]) -> Self {
    modes.iter().fold(StreamMode { keys: false, values: false }, |acc, m| match m {
      StreamModes::Keys => StreamMode { keys: true, ..acc },
      StreamModes::Values => StreamMode { values: true, ..acc },
    })
  }

  pub fn contains(&self, mode: StreamModes) -> bool {
    match mode {
      StreamModes::Keys => self.keys,
      StreamModes::Values => self.values,
    }
  }

  pub fn is_empty(&self) -> bool {
    !self.keys && !self.values
  }
}

impl Default for StreamMode {
  fn default() -> Self {
    StreamMode::KEYS
  }
}

impl fmt::Debug for StreamMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut set = f.debug_set();
    if self.keys {
      set.entry(&StreamModes::Keys);
    }
    if self.values {
      set.entry(&StreamModes::Values);
    }
    set.finish()
  }
}

/// Default lifespan, in milliseconds, attached to entries written without an
/// explicit [`Lifespan`](crate::meta::Lifespan) meta param. `None` means no
/// default is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DefaultLifespan(pub Option<u64>);

/// One execution-time parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
  AccessMode(AccessMode),
  StreamMode(StreamMode),
  WaitMode(WaitMode),
  Lifespan(DefaultLifespan),
}

impl Param {
  pub fn id(&self) -> ParamId {
    match self {
      Param::AccessMode(_) => ParamId::AccessMode,
      Param::StreamMode(_) => ParamId::StreamMode,
      Param::WaitMode(_) => ParamId::WaitMode,
      Param::Lifespan(_) => ParamId::Lifespan,
    }
  }
}

impl From<AccessMode> for Param {
  fn from(mode: AccessMode) -> Self {
    Param::AccessMode(mode)
  }
}

impl From<StreamMode> for Param {
  fn from(mode: StreamMode) -> Self {
    Param::StreamMode(mode)
  }
}

impl From<WaitMode> for Param {
  fn from(mode: WaitMode) -> Self {
    Param::WaitMode(mode)
  }
}

impl From<DefaultLifespan> for Param {
  fn from(lifespan: DefaultLifespan) -> Self {
    Param::Lifespan(lifespan)
  }
}

const DEFAULTS: [Param; ParamId::COUNT] = [
  Param::AccessMode(AccessMode::ReadOnly),
  Param::StreamMode(StreamMode::KEYS),
  Param::WaitMode(WaitMode::NonBlocking),
  Param::Lifespan(DefaultLifespan(None)),
];

/// An immutable set of parameters, one per [`ParamId`].
///
/// Merging never mutates the receiver; [`Params::add_all`] returns a new value.
/// `Params` is `Copy`, so handing a merged set to a new façade costs nothing
/// beyond the array itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Params {
  params: [Param; ParamId::COUNT],
}

impl Params {
  /// The default parameter set.
  pub const fn new() -> Self {
    Self { params: DEFAULTS }
  }

  /// The defaults, overridden by `ps`.
  pub fn from(ps: &[Param]) -> Self {
    Self::new().add_all(ps)
  }

  /// Returns `true` if every parameter in `ps` is already present with the
  /// same value.
  pub fn contains_all(&self, ps: &[Param]) -> bool {
    ps.iter().all(|p| self.params[p.id().index()] == *p)
  }

  /// Returns a copy of this set with each parameter in `ps` written into its
  /// slot. Later entries in `ps` win over earlier ones with the same id.
  pub fn add_all(&self, ps: &[Param]) -> Self {
    let mut params = self.params;
    for p in ps {
      params[p.id().index()] = *p;
    }
    Self { params }
  }

  #[inline]
  pub fn get(&self, id: ParamId) -> Param {
    self.params[id.index()]
  }

  pub fn access_mode(&self) -> AccessMode {
    match self.get(ParamId::AccessMode) {
      Param::AccessMode(mode) => mode,
      _ => unreachable!("slot {} always holds an access mode", ParamId::AccessMode.index()),
    }
  }

  pub fn stream_mode(&self) -> StreamMode {
    match self.get(ParamId::StreamMode) {
      Param::StreamMode(mode) => mode,
      _ => unreachable!("slot {} always holds a stream mode", ParamId::StreamMode.index()),
    }
  }

  pub fn wait_mode(&self) -> WaitMode {
    match self.get(ParamId::WaitMode) {
      Param::WaitMode(mode) => mode,
      _ => unreachable!("slot {} always holds a wait mode", ParamId::WaitMode.index()),
    }
  }

  pub fn lifespan(&self) -> DefaultLifespan {
    match self.get(ParamId::Lifespan) {
      Param::Lifespan(lifespan) => lifespan,
      _ => unreachable!("slot {} always holds a lifespan", ParamId::Lifespan.index()),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &Param> {
    self.params.iter()
  }
}

impl Default for Params {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Params {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Params")
      .field("access_mode", &self.access_mode())
      .field("stream_mode", &self.stream_mode())
      .field("wait_mode", &self.wait_mode())
      .field("lifespan", &self.lifespan().0)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_occupy_their_slots() {
    let params = Params::new();
    assert_eq!(params.access_mode(), AccessMode::ReadOnly);
    assert_eq!(params.stream_mode(), StreamMode::KEYS);
    assert_eq!(params.wait_mode(), WaitMode::NonBlocking);
    assert_eq!(params.lifespan(), DefaultLifespan(None));
    for p in params.iter() {
      assert_eq!(params.get(p.id()), *p);
    }
  }

  #[test]
  fn add_all_returns_new_set_and_keeps_receiver() {
    let base = Params::new();
    let merged = base.add_all(&[WaitMode::Blocking.into(), DefaultLifespan(Some(500)).into()]);

    assert_eq!(base.wait_mode(), WaitMode::NonBlocking);
    assert_eq!(merged.wait_mode(), WaitMode::Blocking);
    assert_eq!(merged.lifespan(), DefaultLifespan(Some(500)));
    assert_eq!(merged.access_mode(), base.access_mode());
  }

  #[test]
  fn later_param_with_same_id_wins() {
    let params = Params::from(&[WaitMode::Blocking.into(), WaitMode::NonBlocking.into()]);
    assert_eq!(params.wait_mode(), WaitMode::NonBlocking);
  }

  #[test]
  fn contains_all_compares_values() {
    let params = Params::from(&[WaitMode::Blocking.into()]);
    assert!(params.contains_all(&[WaitMode::Blocking.into()]));
    assert!(params.contains_all(&[]));
    assert!(!params.contains_all(&[WaitMode::NonBlocking.into()]));
    assert!(params.contains_all(&[StreamMode::KEYS.into(), AccessMode::ReadOnly.into()]));
  }

  #[test]
  fn stream_mode_sets() {
    let both = StreamMode::of(&[StreamModes::Values, StreamModes::Keys]);
    assert_eq!(both, StreamMode::KEYS_AND_VALUES);
    assert!(both.contains(StreamModes::Keys));
    assert!(StreamMode::of(&[]).is_empty());
    assert!(!StreamMode::VALUES.contains(StreamModes::Keys));
    assert!(AccessMode::WriteOnly.is_write());
    assert!(!AccessMode::ReadOnly.is_write());
  }
}
