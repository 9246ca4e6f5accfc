use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector shared by every façade of a map.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub(crate) struct Metrics {
  // --- Operations ---
  pub(crate) reads: CachePadded<AtomicU64>,
  pub(crate) writes: CachePadded<AtomicU64>,

  // --- Transitions ---
  pub(crate) creates: CachePadded<AtomicU64>,
  pub(crate) modifies: CachePadded<AtomicU64>,
  pub(crate) removes: CachePadded<AtomicU64>,
  pub(crate) truncates: CachePadded<AtomicU64>,

  // --- Listeners ---
  pub(crate) listener_notifications: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      reads: CachePadded::new(AtomicU64::new(0)),
      writes: CachePadded::new(AtomicU64::new(0)),
      creates: CachePadded::new(AtomicU64::new(0)),
      modifies: CachePadded::new(AtomicU64::new(0)),
      removes: CachePadded::new(AtomicU64::new(0)),
      truncates: CachePadded::new(AtomicU64::new(0)),
      listener_notifications: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn incr(counter: &AtomicU64, by: u64) {
    if by > 0 {
      counter.fetch_add(by, Ordering::Relaxed);
    }
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    MetricsSnapshot {
      reads: self.reads.load(Ordering::Relaxed),
      writes: self.writes.load(Ordering::Relaxed),
      creates: self.creates.load(Ordering::Relaxed),
      modifies: self.modifies.load(Ordering::Relaxed),
      removes: self.removes.load(Ordering::Relaxed),
      truncates: self.truncates.load(Ordering::Relaxed),
      listener_notifications: self.listener_notifications.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of a map's metrics.
#[derive(Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
  /// The number of entry views built for reading.
  pub reads: u64,
  /// The number of `set` and `remove` calls made through entry views.
  pub writes: u64,
  /// The number of entries created.
  pub creates: u64,
  /// The number of entries whose value was replaced.
  pub modifies: u64,
  /// The number of entries removed.
  pub removes: u64,
  /// The number of times the whole map was truncated.
  pub truncates: u64,
  /// The number of individual listener callbacks invoked.
  pub listener_notifications: u64,
  /// The number of seconds the map has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("reads", &self.reads)
      .field("writes", &self.writes)
      .field("creates", &self.creates)
      .field("modifies", &self.modifies)
      .field("removes", &self.removes)
      .field("truncates", &self.truncates)
      .field("listener_notifications", &self.listener_notifications)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
