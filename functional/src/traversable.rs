//! Pull-based results of bulk operations.
//!
//! A [`Traversable`] is a lazily evaluated sequence with a deliberately small
//! set of operations: nothing that needs to see the whole sequence up front
//! (no `distinct`, `sorted` or `limit`). When the caller wants to stop early
//! it converts the traversable into a [`CloseableIterator`] and closes it,
//! which releases the underlying source immediately.

use std::cmp::Ordering;
use std::fmt;

/// A lazily evaluated, single-use sequence of results.
///
/// `Traversable` is intentionally not an [`Iterator`]. Terminal operations
/// consume it; intermediate operations return a new traversable. Use
/// [`iterator`](Self::iterator) to pull elements one at a time.
#[must_use = "traversables are lazy and do nothing unless consumed"]
pub struct Traversable<'a, T> {
  source: Box<dyn Iterator<Item = T> + 'a>,
}

impl<'a, T: 'a> Traversable<'a, T> {
  /// Wraps an iterator. Elements are evaluated as they are pulled.
  pub fn new<I>(source: I) -> Self
  where
    I: IntoIterator<Item = T>,
    I::IntoIter: 'a,
  {
    Self {
      source: Box::new(source.into_iter()),
    }
  }

  /// Evaluates `source` completely before returning.
  pub fn eager<I>(source: I) -> Self
  where
    I: IntoIterator<Item = T>,
  {
    let materialized: Vec<T> = source.into_iter().collect();
    Self::new(materialized)
  }

  pub fn empty() -> Self {
    Self::new(std::iter::empty())
  }

  // --- Intermediate operations ---

  pub fn filter<P>(self, predicate: P) -> Self
  where
    P: FnMut(&T) -> bool + 'a,
  {
    Self::new(self.source.filter(predicate))
  }

  pub fn map<U: 'a, F>(self, f: F) -> Traversable<'a, U>
  where
    F: FnMut(T) -> U + 'a,
  {
    Traversable::new(self.source.map(f))
  }

  pub fn flat_map<U: 'a, I, F>(self, f: F) -> Traversable<'a, U>
  where
    I: IntoIterator<Item = U> + 'a,
    I::IntoIter: 'a,
    F: FnMut(T) -> I + 'a,
  {
    Traversable::new(self.source.flat_map(f))
  }

  /// Calls `f` on each element as it passes through.
  pub fn peek<F>(self, f: F) -> Self
  where
    F: FnMut(&T) + 'a,
  {
    Self::new(self.source.inspect(f))
  }

  // --- Terminal operations ---

  pub fn for_each<F>(self, f: F)
  where
    F: FnMut(T),
  {
    self.source.for_each(f)
  }

  /// Combines all elements with `op`, starting from `identity`.
  pub fn reduce<F>(self, identity: T, op: F) -> T
  where
    F: FnMut(T, T) -> T,
  {
    self.source.fold(identity, op)
  }

  /// Combines all elements with `op`. `None` for an empty sequence.
  pub fn reduce_opt<F>(self, op: F) -> Option<T>
  where
    F: FnMut(T, T) -> T,
  {
    self.source.reduce(op)
  }

  /// Accumulates the elements into a value of another type.
  pub fn fold<U, F>(self, init: U, f: F) -> U
  where
    F: FnMut(U, T) -> U,
  {
    self.source.fold(init, f)
  }

  pub fn collect<C>(self) -> C
  where
    C: FromIterator<T>,
  {
    self.source.collect()
  }

  pub fn min_by<F>(self, compare: F) -> Option<T>
  where
    F: FnMut(&T, &T) -> Ordering,
  {
    self.source.min_by(compare)
  }

  pub fn max_by<F>(self, compare: F) -> Option<T>
  where
    F: FnMut(&T, &T) -> Ordering,
  {
    self.source.max_by(compare)
  }

  pub fn min(self) -> Option<T>
  where
    T: Ord,
  {
    self.source.min()
  }

  pub fn max(self) -> Option<T>
  where
    T: Ord,
  {
    self.source.max()
  }

  pub fn count(self) -> usize {
    self.source.count()
  }

  /// Stops at the first element that satisfies `predicate`.
  pub fn any_match<P>(mut self, predicate: P) -> bool
  where
    P: FnMut(T) -> bool,
  {
    self.source.any(predicate)
  }

  /// Stops at the first element that fails `predicate`.
  pub fn all_match<P>(mut self, predicate: P) -> bool
  where
    P: FnMut(T) -> bool,
  {
    self.source.all(predicate)
  }

  pub fn none_match<P>(self, predicate: P) -> bool
  where
    P: FnMut(T) -> bool,
  {
    !self.any_match(predicate)
  }

  /// Some element of the sequence, or `None` if it is empty. Only the first
  /// element is evaluated.
  pub fn find_any(mut self) -> Option<T> {
    self.source.next()
  }

  /// Converts into a pull iterator that can be closed early.
  pub fn iterator(self) -> CloseableIterator<'a, T> {
    CloseableIterator::new(self.source)
  }
}

impl<T> fmt::Debug for Traversable<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Traversable").finish_non_exhaustive()
  }
}

/// An iterator whose source can be released before it is exhausted.
///
/// After [`close`](Self::close) the iterator yields nothing. Dropping an
/// ordinary iterator closes it; dropping a [`draining`](Self::draining) one
/// first runs whatever the source has left.
#[must_use = "closeable iterators may be lazy; close them to skip the remaining work"]
pub struct CloseableIterator<'a, T> {
  source: Option<Box<dyn Iterator<Item = T> + 'a>>,
  drain_on_drop: bool,
}

impl<'a, T: 'a> CloseableIterator<'a, T> {
  pub fn new<I>(source: I) -> Self
  where
    I: IntoIterator<Item = T>,
    I::IntoIter: 'a,
  {
    Self {
      source: Some(Box::new(source.into_iter())),
      drain_on_drop: false,
    }
  }

  /// Like [`new`](Self::new), but an iterator dropped before it is exhausted
  /// pulls the rest of `source`. Only an explicit [`close`](Self::close)
  /// skips the remainder.
  pub fn draining<I>(source: I) -> Self
  where
    I: IntoIterator<Item = T>,
    I::IntoIter: 'a,
  {
    Self {
      source: Some(Box::new(source.into_iter())),
      drain_on_drop: true,
    }
  }

  /// Evaluates `source` completely before returning.
  pub fn eager<I>(source: I) -> Self
  where
    I: IntoIterator<Item = T>,
  {
    let materialized: Vec<T> = source.into_iter().collect();
    Self::new(materialized)
  }
}

impl<T> CloseableIterator<'_, T> {
  /// Releases the underlying source. Idempotent.
  pub fn close(&mut self) {
    if self.source.take().is_some() {
      tracing::trace!("closeable iterator closed");
    }
  }

  pub fn is_closed(&self) -> bool {
    self.source.is_none()
  }
}

impl<T> Iterator for CloseableIterator<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    self.source.as_mut()?.next()
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    match &self.source {
      Some(source) => source.size_hint(),
      None => (0, Some(0)),
    }
  }
}

impl<T> Drop for CloseableIterator<'_, T> {
  fn drop(&mut self) {
    if self.drain_on_drop && !std::thread::panicking() {
      if let Some(source) = self.source.take() {
        let remaining = source.count();
        tracing::trace!(remaining, "closeable iterator drained on drop");
      }
    }
    self.close();
  }
}

impl<T> fmt::Debug for CloseableIterator<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CloseableIterator")
      .field("closed", &self.is_closed())
      .finish()
  }
}
