use crate::entry::InternalEntry;
use crate::executor::Executor;
use crate::listener::Notifier;
use crate::map::Status;
use crate::meta::Writable;
use crate::metrics::Metrics;
use crate::params::{DefaultLifespan, Params};
use crate::store::{ShardedStore, Transition, Update};
use crate::view::ReadEntryView;

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The internal, thread-safe core shared by every façade of one map.
pub(crate) struct Shared<K, V, H> {
  pub(crate) store: Arc<ShardedStore<K, V, H>>,
  pub(crate) notifier: Arc<Notifier<K, V>>,
  pub(crate) metrics: Metrics,
  pub(crate) executor: Arc<dyn Executor>,
  /// Params inherited by every façade created from the map.
  pub(crate) defaults: Params,
  stopped: AtomicBool,
}

impl<K, V, H> fmt::Debug for Shared<K, V, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Shared")
      .field("store", &self.store)
      .field("notifier", &self.notifier)
      .field("defaults", &self.defaults)
      .field("stopped", &self.stopped.load(Ordering::Relaxed))
      .field("metrics", &self.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, H> Shared<K, V, H>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
  H: BuildHasher + Clone + Send + Sync + 'static,
{
  pub(crate) fn new(store: ShardedStore<K, V, H>, executor: Arc<dyn Executor>, defaults: Params) -> Self {
    Self {
      store: Arc::new(store),
      notifier: Arc::new(Notifier::new()),
      metrics: Metrics::new(),
      executor,
      defaults,
      stopped: AtomicBool::new(false),
    }
  }

  pub(crate) fn status(&self) -> Status {
    if self.stopped.load(Ordering::Acquire) {
      Status::Stopped
    } else {
      Status::Started
    }
  }

  /// Marks the map stopped. Returns `true` for the call that performed the
  /// transition.
  pub(crate) fn close(&self) -> bool {
    let transitioned = !self.stopped.swap(true, Ordering::AcqRel);
    if transitioned {
      tracing::debug!(entries = self.store.len(), "functional map stopped");
    }
    transitioned
  }

  /// Builds a snapshot view of `key`'s current entry.
  pub(crate) fn read(&self, key: K) -> ReadEntryView<K, V> {
    self.metrics.reads.fetch_add(1, Ordering::Relaxed);
    let entry = self.store.get(&key);
    ReadEntryView::new(key, entry)
  }

  /// Wraps an entry taken from a store snapshot.
  pub(crate) fn view_of(&self, key: K, entry: Arc<InternalEntry<V>>) -> ReadEntryView<K, V> {
    self.metrics.reads.fetch_add(1, Ordering::Relaxed);
    ReadEntryView::new(key, Some(entry))
  }

  /// Current entry for `key`, without counting a read.
  pub(crate) fn peek(&self, key: &K) -> Option<Arc<InternalEntry<V>>> {
    self.store.get(key)
  }

  /// Creates or replaces the entry for `key`, merging `metas` over the
  /// metadata of the entry being replaced.
  pub(crate) fn put<I>(&self, key: &K, value: V, metas: I, lifespan: DefaultLifespan) -> Transition<V>
  where
    I: IntoIterator<Item = Writable>,
  {
    let transition = self.store.update(key, |previous| {
      Update::Put(Arc::new(InternalEntry::compose(previous, value, metas, lifespan)))
    });
    self.record(&transition);
    transition
  }

  /// Like [`put`](Self::put), but only if `predicate` accepts the entry that
  /// is current at the moment of the write. The predicate runs under the
  /// shard's write lock and must not call back into the map.
  pub(crate) fn put_if<P, I>(
    &self,
    key: &K,
    predicate: P,
    value: V,
    metas: I,
    lifespan: DefaultLifespan,
  ) -> Transition<V>
  where
    P: FnOnce(&ReadEntryView<K, V>) -> bool,
    I: IntoIterator<Item = Writable>,
  {
    let transition = self.store.update(key, |previous| {
      let current = ReadEntryView::new(key.clone(), previous.cloned());
      if predicate(&current) {
        Update::Put(Arc::new(InternalEntry::compose(previous, value, metas, lifespan)))
      } else {
        Update::Keep
      }
    });
    self.record(&transition);
    transition
  }

  pub(crate) fn remove(&self, key: &K) -> Transition<V> {
    let transition = self.store.update(key, |_| Update::Remove);
    self.record(&transition);
    transition
  }

  pub(crate) fn truncate(&self) {
    self.store.clear();
    self.metrics.truncates.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("functional map truncated");
  }

  fn record(&self, transition: &Transition<V>) {
    self.metrics.writes.fetch_add(1, Ordering::Relaxed);
    let counter = match transition {
      Transition::Unchanged(_) => return,
      Transition::Created(_) => &self.metrics.creates,
      Transition::Modified { .. } => &self.metrics.modifies,
      Transition::Removed(_) => &self.metrics.removes,
    };
    counter.fetch_add(1, Ordering::Relaxed);
  }

  /// Reports a write-only mutation. Every write fires `on_write`, including
  /// the removal of a key that was already absent.
  pub(crate) fn notify_write(&self, key: &K, transition: &Transition<V>) {
    if !self.notifier.has_write() {
      return;
    }
    let written = ReadEntryView::new(key.clone(), transition.current().cloned());
    let fired = self.notifier.fire_write(&written);
    Metrics::incr(&self.metrics.listener_notifications, fired);
  }

  /// Reports a read-write mutation as a create, modify or remove event.
  pub(crate) fn notify_read_write(&self, key: &K, transition: &Transition<V>) {
    if !self.notifier.has_read_write() {
      return;
    }
    let fired = match transition {
      Transition::Unchanged(_) => 0,
      Transition::Created(after) => {
        let created = ReadEntryView::new(key.clone(), Some(after.clone()));
        self.notifier.fire_create(&created)
      }
      Transition::Modified { before, after } => {
        let before = ReadEntryView::new(key.clone(), Some(before.clone()));
        let after = ReadEntryView::new(key.clone(), Some(after.clone()));
        self.notifier.fire_modify(&before, &after)
      }
      Transition::Removed(before) => {
        let removed = ReadEntryView::new(key.clone(), Some(before.clone()));
        self.notifier.fire_remove(&removed)
      }
    };
    Metrics::incr(&self.metrics.listener_notifications, fired);
  }
}
