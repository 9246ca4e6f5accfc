use std::sync::Arc;

/// One element of a store-wide traversal, shaped by the façade's
/// [`StreamMode`](crate::StreamMode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pair<K, V> {
  /// Only the key was requested.
  Key(K),
  /// Only the value was requested.
  Value(Arc<V>),
  /// Both the key and the value were requested.
  Both(K, Arc<V>),
}

impl<K, V> Pair<K, V> {
  pub fn key(&self) -> Option<&K> {
    match self {
      Pair::Key(k) | Pair::Both(k, _) => Some(k),
      Pair::Value(_) => None,
    }
  }

  pub fn value(&self) -> Option<&Arc<V>> {
    match self {
      Pair::Value(v) | Pair::Both(_, v) => Some(v),
      Pair::Key(_) => None,
    }
  }

  /// Splits the pair into its optional halves.
  pub fn into_parts(self) -> (Option<K>, Option<Arc<V>>) {
    match self {
      Pair::Key(k) => (Some(k), None),
      Pair::Value(v) => (None, Some(v)),
      Pair::Both(k, v) => (Some(k), Some(v)),
    }
  }
}
