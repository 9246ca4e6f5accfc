use crate::meta::{Created, Lifespan, MetaParam, MetaParamId, MetaParamLookup, MetaParams, Writable};
use crate::params::DefaultLifespan;
use crate::time;

use std::sync::Arc;

/// A stored value together with its metadata.
///
/// Entries are immutable once published to the store. A write builds a new
/// `InternalEntry`, so readers holding an `Arc` to the previous one keep a
/// consistent view of it.
#[derive(Debug)]
pub(crate) struct InternalEntry<V> {
  /// The user's value, wrapped in an Arc so `V` need not be `Clone`.
  pub(crate) value: Arc<V>,
  pub(crate) metas: MetaParams,
}

impl<V> InternalEntry<V> {
  pub(crate) fn new(value: V, metas: MetaParams) -> Self {
    Self {
      value: Arc::new(value),
      metas,
    }
  }

  /// Builds the entry that replaces `previous` on a `set`.
  ///
  /// Metadata of the previous entry is kept and the supplied metas are merged
  /// over it. A new entry is stamped with `Created`. When `default_lifespan`
  /// is set and the result carries no `Lifespan`, the default is attached.
  pub(crate) fn compose<I>(
    previous: Option<&Arc<InternalEntry<V>>>,
    value: V,
    supplied: I,
    default_lifespan: DefaultLifespan,
  ) -> Self
  where
    I: IntoIterator<Item = Writable>,
  {
    let mut metas = match previous {
      Some(prev) => prev.metas.clone(),
      None => MetaParams::of([Created(time::now_millis())]),
    };
    metas.add_many(supplied);
    if let DefaultLifespan(Some(ms)) = default_lifespan {
      if !metas.contains(MetaParamId::Lifespan) {
        metas.add(Lifespan(ms));
      }
    }
    Self::new(value, metas)
  }

  /// Returns a clone of the `Arc` containing the value.
  #[inline]
  pub(crate) fn value(&self) -> Arc<V> {
    self.value.clone()
  }
}

impl<V> MetaParamLookup for InternalEntry<V> {
  fn find_meta_param<M: MetaParam>(&self) -> Option<M> {
    self.metas.find::<M>()
  }
}
