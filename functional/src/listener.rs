//! Mutation listeners.
//!
//! Listeners are invoked synchronously on the thread performing the mutation,
//! after the store has been updated and before the operation's result is
//! delivered. The registry is copy-on-write: registration swaps in a new
//! snapshot, and notification iterates over the snapshot it captured without
//! holding any lock, so listeners may register or deregister other listeners
//! (or themselves) while being notified.

use crate::view::ReadEntryView;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// A listener for the create, modify and remove events produced by a
/// read-write map. Every method has a no-op default, so implementors only
/// override the events they care about.
pub trait ReadWriteListener<K, V>: Send + Sync {
  /// Called after an absent key was given a value.
  fn on_create(&self, created: &ReadEntryView<K, V>) {
    let _ = created;
  }

  /// Called after a present key had its value replaced.
  fn on_modify(&self, before: &ReadEntryView<K, V>, after: &ReadEntryView<K, V>) {
    let _ = (before, after);
  }

  /// Called after a present key was removed. The view holds the removed entry.
  fn on_remove(&self, removed: &ReadEntryView<K, V>) {
    let _ = removed;
  }
}

/// A listener for the write events produced by a write-only map.
///
/// Write-only operations cannot tell a create from a modify, so every
/// mutation, including the removal of an absent key, is reported as a write.
/// For removals the view holds no value.
pub trait WriteListener<K, V>: Send + Sync {
  fn on_write(&self, written: &ReadEntryView<K, V>);
}

impl<K, V, F> WriteListener<K, V> for F
where
  F: Fn(&ReadEntryView<K, V>) + Send + Sync,
{
  fn on_write(&self, written: &ReadEntryView<K, V>) {
    self(written)
  }
}

struct OnCreate<F>(F);
struct OnModify<F>(F);
struct OnRemove<F>(F);

impl<K, V, F> ReadWriteListener<K, V> for OnCreate<F>
where
  F: Fn(&ReadEntryView<K, V>) + Send + Sync,
{
  fn on_create(&self, created: &ReadEntryView<K, V>) {
    (self.0)(created)
  }
}

impl<K, V, F> ReadWriteListener<K, V> for OnModify<F>
where
  F: Fn(&ReadEntryView<K, V>, &ReadEntryView<K, V>) + Send + Sync,
{
  fn on_modify(&self, before: &ReadEntryView<K, V>, after: &ReadEntryView<K, V>) {
    (self.0)(before, after)
  }
}

impl<K, V, F> ReadWriteListener<K, V> for OnRemove<F>
where
  F: Fn(&ReadEntryView<K, V>) + Send + Sync,
{
  fn on_remove(&self, removed: &ReadEntryView<K, V>) {
    (self.0)(removed)
  }
}

type ListenerId = u64;

/// A copy-on-write list of listeners in registration order.
struct CowList<T: ?Sized> {
  entries: RwLock<Arc<[(ListenerId, Arc<T>)]>>,
}

impl<T: ?Sized> CowList<T> {
  fn new() -> Self {
    Self {
      entries: RwLock::new(Arc::from(Vec::new())),
    }
  }

  fn push(&self, id: ListenerId, listener: Arc<T>) {
    let mut guard = self.entries.write();
    let mut next: Vec<_> = guard.iter().cloned().collect();
    next.push((id, listener));
    *guard = Arc::from(next);
  }

  fn remove(&self, id: ListenerId) -> bool {
    let mut guard = self.entries.write();
    if !guard.iter().any(|(existing, _)| *existing == id) {
      return false;
    }
    let next: Vec<_> = guard.iter().filter(|(existing, _)| *existing != id).cloned().collect();
    *guard = Arc::from(next);
    true
  }

  #[inline]
  fn snapshot(&self) -> Arc<[(ListenerId, Arc<T>)]> {
    self.entries.read().clone()
  }

  #[inline]
  fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }

  fn len(&self) -> usize {
    self.entries.read().len()
  }
}

/// Removes registrations by id. Lets [`ListenerHandle`] stay free of the
/// map's type parameters.
trait Deregister: Send + Sync {
  fn deregister(&self, id: ListenerId) -> bool;
}

/// The listener registry shared by every façade of a map.
pub(crate) struct Notifier<K, V> {
  next_id: AtomicU64,
  on_create: CowList<dyn ReadWriteListener<K, V>>,
  on_modify: CowList<dyn ReadWriteListener<K, V>>,
  on_remove: CowList<dyn ReadWriteListener<K, V>>,
  on_write: CowList<dyn WriteListener<K, V>>,
}

impl<K, V> fmt::Debug for Notifier<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Notifier")
      .field("on_create", &self.on_create.len())
      .field("on_modify", &self.on_modify.len())
      .field("on_remove", &self.on_remove.len())
      .field("on_write", &self.on_write.len())
      .finish()
  }
}

impl<K, V> Notifier<K, V>
where
  K: Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn new() -> Self {
    Self {
      next_id: AtomicU64::new(1),
      on_create: CowList::new(),
      on_modify: CowList::new(),
      on_remove: CowList::new(),
      on_write: CowList::new(),
    }
  }

  fn next_id(&self) -> ListenerId {
    self.next_id.fetch_add(1, Ordering::Relaxed)
  }

  fn handle(self: &Arc<Self>, id: ListenerId) -> ListenerHandle {
    let registry: Weak<dyn Deregister> = Arc::downgrade(self) as Weak<dyn Deregister>;
    ListenerHandle {
      id,
      registry: Some(registry),
    }
  }

  fn register_read_write(
    self: &Arc<Self>,
    listener: Arc<dyn ReadWriteListener<K, V>>,
    create: bool,
    modify: bool,
    remove: bool,
  ) -> ListenerHandle {
    let id = self.next_id();
    if create {
      self.on_create.push(id, listener.clone());
    }
    if modify {
      self.on_modify.push(id, listener.clone());
    }
    if remove {
      self.on_remove.push(id, listener);
    }
    tracing::debug!(listener_id = id, create, modify, remove, "registered read-write listener");
    self.handle(id)
  }

  fn register_write(self: &Arc<Self>, listener: Arc<dyn WriteListener<K, V>>) -> ListenerHandle {
    let id = self.next_id();
    self.on_write.push(id, listener);
    tracing::debug!(listener_id = id, "registered write listener");
    self.handle(id)
  }

  pub(crate) fn has_read_write(&self) -> bool {
    !(self.on_create.is_empty() && self.on_modify.is_empty() && self.on_remove.is_empty())
  }

  pub(crate) fn has_write(&self) -> bool {
    !self.on_write.is_empty()
  }

  /// Fires `on_create`. Returns the number of listeners invoked.
  pub(crate) fn fire_create(&self, created: &ReadEntryView<K, V>) -> u64 {
    let listeners = self.on_create.snapshot();
    for (_, listener) in listeners.iter() {
      listener.on_create(created);
    }
    listeners.len() as u64
  }

  pub(crate) fn fire_modify(&self, before: &ReadEntryView<K, V>, after: &ReadEntryView<K, V>) -> u64 {
    let listeners = self.on_modify.snapshot();
    for (_, listener) in listeners.iter() {
      listener.on_modify(before, after);
    }
    listeners.len() as u64
  }

  pub(crate) fn fire_remove(&self, removed: &ReadEntryView<K, V>) -> u64 {
    let listeners = self.on_remove.snapshot();
    for (_, listener) in listeners.iter() {
      listener.on_remove(removed);
    }
    listeners.len() as u64
  }

  pub(crate) fn fire_write(&self, written: &ReadEntryView<K, V>) -> u64 {
    let listeners = self.on_write.snapshot();
    for (_, listener) in listeners.iter() {
      listener.on_write(written);
    }
    listeners.len() as u64
  }
}

impl<K, V> Deregister for Notifier<K, V>
where
  K: Send + Sync,
  V: Send + Sync,
{
  fn deregister(&self, id: ListenerId) -> bool {
    // A listener object may sit in several category lists under the same id.
    let create = self.on_create.remove(id);
    let modify = self.on_modify.remove(id);
    let remove = self.on_remove.remove(id);
    let write = self.on_write.remove(id);
    let found = create | modify | remove | write;
    if found {
      tracing::debug!(listener_id = id, "deregistered listener");
    }
    found
  }
}

/// Keeps a listener registered.
///
/// Closing or dropping the handle deregisters the listener. Events already
/// delivered are not affected, and a notification that captured its listener
/// snapshot before deregistration may still reach it once.
#[must_use = "dropping a ListenerHandle deregisters the listener; call `detach` to keep it registered"]
pub struct ListenerHandle {
  id: ListenerId,
  registry: Option<Weak<dyn Deregister>>,
}

impl ListenerHandle {
  /// An identifier for the registration, unique within its map.
  pub fn id(&self) -> u64 {
    self.id
  }

  /// Deregisters the listener. Returns `false` if it was no longer registered
  /// or the map has been dropped.
  pub fn close(mut self) -> bool {
    self.release()
  }

  /// Drops the handle but keeps the listener registered for the lifetime of
  /// the map.
  pub fn detach(mut self) {
    self.registry = None;
  }

  fn release(&mut self) -> bool {
    match self.registry.take().and_then(|registry| registry.upgrade()) {
      Some(registry) => registry.deregister(self.id),
      None => false,
    }
  }
}

impl Drop for ListenerHandle {
  fn drop(&mut self) {
    self.release();
  }
}

impl fmt::Debug for ListenerHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ListenerHandle")
      .field("id", &self.id)
      .field("attached", &self.registry.is_some())
      .finish()
  }
}

/// Registration surface for write listeners, returned by
/// [`WriteOnlyMap::listeners`](crate::WriteOnlyMap::listeners).
pub struct WriteListeners<K, V> {
  notifier: Arc<Notifier<K, V>>,
}

impl<K, V> WriteListeners<K, V>
where
  K: Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn new(notifier: Arc<Notifier<K, V>>) -> Self {
    Self { notifier }
  }

  /// Registers a closure invoked for every write-only mutation.
  pub fn on_write<F>(&self, f: F) -> ListenerHandle
  where
    F: Fn(&ReadEntryView<K, V>) + Send + Sync + 'static,
  {
    self.notifier.register_write(Arc::new(f))
  }

  /// Registers a [`WriteListener`] object.
  pub fn add<L>(&self, listener: L) -> ListenerHandle
  where
    L: WriteListener<K, V> + 'static,
  {
    self.notifier.register_write(Arc::new(listener))
  }
}

impl<K, V> fmt::Debug for WriteListeners<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("WriteListeners").field(&self.notifier).finish()
  }
}

/// Registration surface for read-write listeners, returned by
/// [`ReadWriteMap::listeners`](crate::ReadWriteMap::listeners).
///
/// The registry is shared by the whole map, so write listeners registered
/// here are also notified by write-only façades.
pub struct ReadWriteListeners<K, V> {
  notifier: Arc<Notifier<K, V>>,
}

impl<K, V> ReadWriteListeners<K, V>
where
  K: Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn new(notifier: Arc<Notifier<K, V>>) -> Self {
    Self { notifier }
  }

  pub fn on_create<F>(&self, f: F) -> ListenerHandle
  where
    F: Fn(&ReadEntryView<K, V>) + Send + Sync + 'static,
  {
    self.notifier.register_read_write(Arc::new(OnCreate(f)), true, false, false)
  }

  pub fn on_modify<F>(&self, f: F) -> ListenerHandle
  where
    F: Fn(&ReadEntryView<K, V>, &ReadEntryView<K, V>) + Send + Sync + 'static,
  {
    self.notifier.register_read_write(Arc::new(OnModify(f)), false, true, false)
  }

  pub fn on_remove<F>(&self, f: F) -> ListenerHandle
  where
    F: Fn(&ReadEntryView<K, V>) + Send + Sync + 'static,
  {
    self.notifier.register_read_write(Arc::new(OnRemove(f)), false, false, true)
  }

  /// Registers a [`ReadWriteListener`] object for all three categories.
  pub fn add<L>(&self, listener: L) -> ListenerHandle
  where
    L: ReadWriteListener<K, V> + 'static,
  {
    self.notifier.register_read_write(Arc::new(listener), true, true, true)
  }

  pub fn on_write<F>(&self, f: F) -> ListenerHandle
  where
    F: Fn(&ReadEntryView<K, V>) + Send + Sync + 'static,
  {
    self.notifier.register_write(Arc::new(f))
  }

  pub fn add_write<L>(&self, listener: L) -> ListenerHandle
  where
    L: WriteListener<K, V> + 'static,
  {
    self.notifier.register_write(Arc::new(listener))
  }
}

impl<K, V> fmt::Debug for ReadWriteListeners<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ReadWriteListeners").field(&self.notifier).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::Mutex;

  fn view(key: u8) -> ReadEntryView<u8, String> {
    ReadEntryView::absent(key)
  }

  #[test]
  fn fires_in_registration_order() {
    let notifier = Arc::new(Notifier::<u8, String>::new());
    let surface = ReadWriteListeners::new(notifier.clone());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..3)
      .map(|i| {
        let seen = seen.clone();
        surface.on_create(move |_| seen.lock().unwrap().push(i))
      })
      .collect();

    assert_eq!(notifier.fire_create(&view(1)), 3);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    drop(handles);
    assert!(!notifier.has_read_write());
  }

  #[test]
  fn close_and_detach() {
    let notifier = Arc::new(Notifier::<u8, String>::new());
    let surface = WriteListeners::new(notifier.clone());

    let closed = surface.on_write(|_| {});
    assert!(notifier.has_write());
    assert!(closed.close());
    assert!(!notifier.has_write());

    surface.on_write(|_| {}).detach();
    assert_eq!(notifier.fire_write(&view(2)), 1);
  }

  #[test]
  fn object_listener_spans_categories_and_deregisters_once() {
    struct Counting(Arc<AtomicU64>);
    impl ReadWriteListener<u8, String> for Counting {
      fn on_create(&self, _: &ReadEntryView<u8, String>) {
        self.0.fetch_add(1, Ordering::SeqCst);
      }
      fn on_remove(&self, _: &ReadEntryView<u8, String>) {
        self.0.fetch_add(10, Ordering::SeqCst);
      }
    }

    let notifier = Arc::new(Notifier::<u8, String>::new());
    let count = Arc::new(AtomicU64::new(0));
    let handle = ReadWriteListeners::new(notifier.clone()).add(Counting(count.clone()));

    notifier.fire_create(&view(1));
    notifier.fire_modify(&view(1), &view(1));
    notifier.fire_remove(&view(1));
    assert_eq!(count.load(Ordering::SeqCst), 11);

    assert!(handle.close());
    assert!(!notifier.has_read_write());
  }

  #[test]
  fn listener_may_deregister_itself_during_notification() {
    let notifier = Arc::new(Notifier::<u8, String>::new());
    let slot: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicU64::new(0));

    let handle = {
      let slot = slot.clone();
      let calls = calls.clone();
      WriteListeners::new(notifier.clone()).on_write(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = slot.lock().unwrap().take() {
          handle.close();
        }
      })
    };
    *slot.lock().unwrap() = Some(handle);

    notifier.fire_write(&view(1));
    notifier.fire_write(&view(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
