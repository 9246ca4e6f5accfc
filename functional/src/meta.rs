//! Per-entry metadata.
//!
//! A [`MetaParam`] is a typed value tagged with a [`MetaParamId`]. Entries carry
//! them in a [`MetaParams`] collection. Only the [`Writable`] subset may be
//! supplied by callers when writing; the rest (e.g. [`Created`]) are stamped
//! by the map itself.

use crate::error::{Error, Result};

use std::fmt;

/// Identifier of each metadata kind. The catalog is closed, so ids can
/// never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MetaParamId {
  Lifespan = 0,
  Created = 1,
  MaxIdle = 2,
  LastUsed = 3,
  EntryVersion = 4,
}

/// A version attached to an entry, used for conditional replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryVersion {
  Numeric(u64),
}

impl fmt::Display for EntryVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EntryVersion::Numeric(v) => write!(f, "v{}", v),
    }
  }
}

/// Lifespan of an entry, in milliseconds. Writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lifespan(pub u64);

/// Creation time of an entry, in milliseconds since the UNIX epoch.
/// Stamped by the map when an entry is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Created(pub u64);

/// Maximum idle time of an entry, in milliseconds. Writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaxIdle(pub u64);

/// Last time an entry was used, in milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LastUsed(pub u64);

/// Version of an entry. Writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryVersionParam(pub EntryVersion);

/// Type-erased storage for any meta param in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaValue {
  Lifespan(Lifespan),
  Created(Created),
  MaxIdle(MaxIdle),
  LastUsed(LastUsed),
  EntryVersion(EntryVersionParam),
}

impl MetaValue {
  pub fn id(&self) -> MetaParamId {
    match self {
      MetaValue::Lifespan(_) => MetaParamId::Lifespan,
      MetaValue::Created(_) => MetaParamId::Created,
      MetaValue::MaxIdle(_) => MetaParamId::MaxIdle,
      MetaValue::LastUsed(_) => MetaParamId::LastUsed,
      MetaValue::EntryVersion(_) => MetaParamId::EntryVersion,
    }
  }
}

/// A typed metadata parameter with a fixed id.
pub trait MetaParam: Clone + Into<MetaValue> {
  const ID: MetaParamId;

  /// Downcasts the erased value, returning `None` when it holds another kind.
  fn from_value(value: &MetaValue) -> Option<&Self>;
}

/// Marker for the meta params that callers may supply on write.
pub trait WritableMetaParam: MetaParam {}

macro_rules! meta_params {
  ($($ty:ident => $variant:ident),+ $(,)?) => {
    $(
      impl MetaParam for $ty {
        const ID: MetaParamId = MetaParamId::$variant;

        #[inline]
        fn from_value(value: &MetaValue) -> Option<&Self> {
          match value {
            MetaValue::$variant(v) => Some(v),
            _ => None,
          }
        }
      }

      impl From<$ty> for MetaValue {
        fn from(meta: $ty) -> Self {
          MetaValue::$variant(meta)
        }
      }
    )+
  };
}

meta_params! {
  Lifespan => Lifespan,
  Created => Created,
  MaxIdle => MaxIdle,
  LastUsed => LastUsed,
  EntryVersionParam => EntryVersion,
}

macro_rules! writable {
  ($($ty:ident),+ $(,)?) => {
    $(
      impl WritableMetaParam for $ty {}

      impl From<$ty> for Writable {
        fn from(meta: $ty) -> Self {
          Writable(meta.into())
        }
      }
    )+
  };
}

/// A meta param that a caller is allowed to write. Only writable kinds
/// convert into this type, so non-writable metadata such as [`Created`]
/// cannot be passed to `set`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Writable(MetaValue);

impl Writable {
  pub fn id(&self) -> MetaParamId {
    self.0.id()
  }

  pub fn into_value(self) -> MetaValue {
    self.0
  }
}

writable!(Lifespan, MaxIdle, EntryVersionParam);

/// Read access to an entry's metadata.
pub trait MetaParamLookup {
  /// Returns the meta param of type `M`, or `None` if absent.
  fn find_meta_param<M: MetaParam>(&self) -> Option<M>;

  /// Returns the meta param of type `M`.
  ///
  /// # Errors
  /// `Error::NotFound` if the entry has no meta param with `M::ID`.
  fn get_meta_param<M: MetaParam>(&self) -> Result<M> {
    self
      .find_meta_param::<M>()
      .ok_or_else(|| Error::NotFound(format!("metadata with id={:?}", M::ID)))
  }
}

/// A small collection of meta params, at most one per id.
///
/// Lookup is a linear scan: entries carry only a handful of metadata values,
/// and a flat vector keeps the per-entry footprint minimal.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MetaParams {
  metas: Vec<MetaValue>,
}

impl MetaParams {
  pub fn empty() -> Self {
    Self { metas: Vec::new() }
  }

  /// Builds a collection from `metas`. Duplicated ids keep the last value.
  pub fn of<I>(metas: I) -> Self
  where
    I: IntoIterator,
    I::Item: Into<MetaValue>,
  {
    let mut params = Self::empty();
    params.add_many(metas);
    params
  }

  pub fn is_empty(&self) -> bool {
    self.metas.is_empty()
  }

  pub fn len(&self) -> usize {
    self.metas.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &MetaValue> {
    self.metas.iter()
  }

  pub fn contains(&self, id: MetaParamId) -> bool {
    self.find_by_id(id).is_some()
  }

  pub fn find_by_id(&self, id: MetaParamId) -> Option<&MetaValue> {
    self.metas.iter().find(|m| m.id() == id)
  }

  pub fn find<M: MetaParam>(&self) -> Option<M> {
    self.find_by_id(M::ID).and_then(M::from_value).cloned()
  }

  /// # Errors
  /// `Error::NotFound` if no meta param with `M::ID` is present.
  pub fn get<M: MetaParam>(&self) -> Result<M> {
    self
      .find::<M>()
      .ok_or_else(|| Error::NotFound(format!("metadata with id={:?}", M::ID)))
  }

  /// Adds `meta`, overwriting in place any value with the same id.
  pub fn add(&mut self, meta: impl Into<MetaValue>) {
    let meta = meta.into();
    match self.metas.iter_mut().find(|m| m.id() == meta.id()) {
      Some(slot) => *slot = meta,
      None => self.metas.push(meta),
    }
  }

  pub fn add_many<I>(&mut self, metas: I)
  where
    I: IntoIterator,
    I::Item: Into<MetaValue>,
  {
    for meta in metas {
      self.add(meta);
    }
  }
}

impl From<Writable> for MetaValue {
  fn from(meta: Writable) -> Self {
    meta.0
  }
}

impl MetaParamLookup for MetaParams {
  fn find_meta_param<M: MetaParam>(&self) -> Option<M> {
    self.find::<M>()
  }
}

impl fmt::Debug for MetaParams {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.metas.iter()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_find_and_get() {
    let metas = MetaParams::empty();
    assert!(metas.is_empty());
    assert_eq!(metas.len(), 0);
    assert_eq!(metas.find::<Lifespan>(), None);
    assert_eq!(metas.find::<Created>(), None);
    assert_eq!(metas.find::<MaxIdle>(), None);
    assert!(matches!(metas.get::<Lifespan>(), Err(Error::NotFound(_))));
  }

  #[test]
  fn add_then_find_and_replace() {
    let mut metas = MetaParams::empty();
    metas.add(Lifespan(1000));
    assert_eq!(metas.len(), 1);
    assert_eq!(metas.get::<Lifespan>(), Ok(Lifespan(1000)));
    assert_ne!(metas.get::<Lifespan>(), Ok(Lifespan(900)));

    metas.add(Lifespan(900));
    assert_eq!(metas.len(), 1);
    assert_eq!(metas.get::<Lifespan>(), Ok(Lifespan(900)));
  }

  #[test]
  fn add_many_distinct_ids() {
    let mut metas = MetaParams::empty();
    metas.add_many([
      Writable::from(Lifespan(1000)),
      Writable::from(MaxIdle(1000)),
      Writable::from(EntryVersionParam(EntryVersion::Numeric(12345))),
    ]);
    assert_eq!(metas.len(), 3);
    assert_eq!(metas.find::<MaxIdle>(), Some(MaxIdle(1000)));
    assert_eq!(
      metas.find::<EntryVersionParam>(),
      Some(EntryVersionParam(EntryVersion::Numeric(12345)))
    );
  }

  #[test]
  fn add_many_replaces_existing_ids() {
    let mut metas = MetaParams::of([
      Writable::from(Lifespan(1000)),
      Writable::from(MaxIdle(1000)),
      Writable::from(EntryVersionParam(EntryVersion::Numeric(12345))),
    ]);
    metas.add_many([Lifespan(2000), Lifespan(3000)]);
    metas.add(MaxIdle(2000));

    assert_eq!(metas.len(), 3);
    assert_eq!(metas.find::<Lifespan>(), Some(Lifespan(3000)));
    assert_eq!(metas.find::<MaxIdle>(), Some(MaxIdle(2000)));
    assert_eq!(
      metas.find::<EntryVersionParam>(),
      Some(EntryVersionParam(EntryVersion::Numeric(12345)))
    );
  }

  #[test]
  fn duplicates_on_construction_keep_last() {
    let metas = MetaParams::of([
      EntryVersionParam(EntryVersion::Numeric(100)),
      EntryVersionParam(EntryVersion::Numeric(200)),
    ]);
    assert_eq!(metas.len(), 1);
    assert_eq!(
      metas.get::<EntryVersionParam>(),
      Ok(EntryVersionParam(EntryVersion::Numeric(200)))
    );
  }

  #[test]
  fn mixed_kinds_and_lookup_trait() {
    let metas = MetaParams::of([
      MetaValue::from(Created(1000)),
      MetaValue::from(LastUsed(2000)),
      MetaValue::from(Lifespan(3000)),
      MetaValue::from(MaxIdle(4000)),
    ]);
    assert_eq!(metas.len(), 4);
    assert!(metas.contains(MetaParamId::LastUsed));
    assert!(!metas.contains(MetaParamId::EntryVersion));
    assert_eq!(metas.find_meta_param::<Created>(), Some(Created(1000)));
    assert!(metas.get_meta_param::<EntryVersionParam>().is_err());
  }

  #[test]
  fn writable_keeps_its_id() {
    let w = Writable::from(MaxIdle(5));
    assert_eq!(w.id(), MetaParamId::MaxIdle);
    assert_eq!(w.into_value(), MetaValue::MaxIdle(MaxIdle(5)));
    assert!(EntryVersion::Numeric(1) < EntryVersion::Numeric(2));
  }
}
