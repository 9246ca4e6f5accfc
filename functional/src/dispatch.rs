//! Wait-mode dispatch.
//!
//! Every façade operation produces its result through a [`Dispatcher`]. The
//! blocking dispatcher runs the work on the caller's thread and hands back an
//! already-completed [`Completion`]; the non-blocking dispatcher schedules the
//! work on an [`Executor`] and hands back a pending one. The dispatcher is
//! picked once, when a façade is built from its parameters, so individual
//! calls never branch on the wait mode.

use crate::executor::{Executor, Job};
use crate::params::WaitMode;

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::thread::{self, Thread};

use futures_util::future::FusedFuture;
use parking_lot::Mutex;

type Panic = Box<dyn Any + Send + 'static>;

/// A thread or task waiting on a `Completion`.
enum Waiter {
  Sync(Thread),
  Async(Waker),
}

impl Waiter {
  fn wake(self) {
    match self {
      Waiter::Sync(thread) => thread.unpark(),
      Waiter::Async(waker) => waker.wake(),
    }
  }
}

enum State<T> {
  Pending,
  Ready(thread::Result<T>),
  Taken,
}

struct Inner<T> {
  state: State<T>,
  waiters: VecDeque<Waiter>,
}

struct Slot<T> {
  inner: Mutex<Inner<T>>,
}

impl<T> Slot<T> {
  fn fill(&self, result: thread::Result<T>) {
    let mut inner = self.inner.lock();
    inner.state = State::Ready(result);
    for waiter in inner.waiters.drain(..) {
      waiter.wake();
    }
  }
}

impl<T> Drop for Slot<T> {
  fn drop(&mut self) {
    if let State::Ready(Err(payload)) = &self.inner.get_mut().state {
      let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>");
      tracing::error!(panic = message, "operation panicked and its completion was never consumed");
    }
  }
}

/// The asynchronous result of a façade operation.
///
/// A `Completion` can be awaited from async code or waited on from a
/// synchronous thread. If non-blocking work panicked (including a panicking
/// listener), the panic is resumed in whichever context consumes the result.
/// A completion dropped unconsumed only logs the panic, so callers that need
/// to observe failures must `wait` or `.await` it. Blocking work is not
/// captured at all: its panic unwinds out of the `eval` call itself.
#[must_use = "a completion carries the result and any panic of the operation"]
pub struct Completion<T> {
  slot: Arc<Slot<T>>,
}

/// The producing side of a pending [`Completion`].
pub(crate) struct Promise<T> {
  slot: Option<Arc<Slot<T>>>,
}

impl<T> Promise<T> {
  pub(crate) fn complete(mut self, result: thread::Result<T>) {
    if let Some(slot) = self.slot.take() {
      slot.fill(result);
    }
  }
}

impl<T> Drop for Promise<T> {
  fn drop(&mut self) {
    // The job was dropped without running, e.g. the executor refused it.
    if let Some(slot) = self.slot.take() {
      let reason: Panic = Box::new("operation was dropped before it completed");
      slot.fill(Err(reason));
    }
  }
}

impl<T> Completion<T> {
  /// A completion that already holds `value`.
  pub fn ready(value: T) -> Self {
    Self::from_result(Ok(value))
  }

  fn from_result(result: thread::Result<T>) -> Self {
    Self {
      slot: Arc::new(Slot {
        inner: Mutex::new(Inner {
          state: State::Ready(result),
          waiters: VecDeque::new(),
        }),
      }),
    }
  }

  pub(crate) fn pending() -> (Promise<T>, Self) {
    let slot = Arc::new(Slot {
      inner: Mutex::new(Inner {
        state: State::Pending,
        waiters: VecDeque::new(),
      }),
    });
    (Promise { slot: Some(slot.clone()) }, Self { slot })
  }

  /// Returns `true` once the operation has finished, successfully or not.
  pub fn is_done(&self) -> bool {
    !matches!(self.slot.inner.lock().state, State::Pending)
  }

  /// Takes the result if the operation has finished, or gives the
  /// completion back unchanged.
  pub fn try_take(self) -> Result<T, Self> {
    let mut inner = self.slot.inner.lock();
    match std::mem::replace(&mut inner.state, State::Taken) {
      State::Ready(result) => {
        drop(inner);
        Ok(unwrap_or_resume(result))
      }
      other => {
        inner.state = other;
        drop(inner);
        Err(self)
      }
    }
  }

  /// Blocks the current thread until the operation finishes and returns its
  /// result.
  pub fn wait(self) -> T {
    let mut registered = false;
    loop {
      {
        let mut inner = self.slot.inner.lock();
        match std::mem::replace(&mut inner.state, State::Taken) {
          State::Ready(result) => {
            drop(inner);
            return unwrap_or_resume(result);
          }
          State::Pending => {
            inner.state = State::Pending;
            if !registered {
              inner.waiters.push_back(Waiter::Sync(thread::current()));
              registered = true;
            }
          }
          State::Taken => unreachable!("completion result taken twice"),
        }
      }
      // Spurious unparks loop back to the state check; the waiter queued
      // above stays queued until `fill` drains it.
      thread::park();
    }
  }

  /// Maps the eventual result with `f`. The mapping runs on the consuming
  /// side, when the result is taken.
  pub fn map<U, F>(self, f: F) -> Map<T, F>
  where
    F: FnOnce(T) -> U,
  {
    Map {
      inner: self,
      f: Some(f),
    }
  }
}

fn unwrap_or_resume<T>(result: thread::Result<T>) -> T {
  match result {
    Ok(value) => value,
    Err(payload) => panic::resume_unwind(payload),
  }
}

impl<T> fmt::Debug for Completion<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = match self.slot.inner.lock().state {
      State::Pending => "pending",
      State::Ready(Ok(_)) => "ready",
      State::Ready(Err(_)) => "panicked",
      State::Taken => "taken",
    };
    f.debug_struct("Completion").field("state", &state).finish()
  }
}

impl<T> Future for Completion<T> {
  type Output = T;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut inner = self.slot.inner.lock();
    match std::mem::replace(&mut inner.state, State::Taken) {
      State::Ready(result) => {
        drop(inner);
        Poll::Ready(unwrap_or_resume(result))
      }
      State::Pending => {
        inner.state = State::Pending;
        if !inner.waiters.iter().any(|w| matches!(w, Waiter::Async(waker) if waker.will_wake(cx.waker()))) {
          inner.waiters.push_back(Waiter::Async(cx.waker().clone()));
        }
        Poll::Pending
      }
      State::Taken => panic!("`Completion` polled after it returned `Poll::Ready`"),
    }
  }
}

impl<T> FusedFuture for Completion<T> {
  fn is_terminated(&self) -> bool {
    matches!(self.slot.inner.lock().state, State::Taken)
  }
}

/// Future returned by [`Completion::map`].
pub struct Map<T, F> {
  inner: Completion<T>,
  f: Option<F>,
}

impl<T, F> Unpin for Map<T, F> {}

impl<T, U, F> Map<T, F>
where
  F: FnOnce(T) -> U,
{
  /// Blocks until the underlying operation finishes, then maps its result.
  pub fn wait(mut self) -> U {
    let f = self.f.take().expect("`Map` consumed twice");
    f(self.inner.wait())
  }
}

impl<T, U, F> Future for Map<T, F>
where
  F: FnOnce(T) -> U,
{
  type Output = U;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    match Pin::new(&mut self.inner).poll(cx) {
      Poll::Ready(value) => {
        let f = self.f.take().expect("`Map` polled after completion");
        Poll::Ready(f(value))
      }
      Poll::Pending => Poll::Pending,
    }
  }
}

/// How traversals produced by bulk operations are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Evaluation {
  /// Fully materialized before being returned.
  Eager,
  /// Evaluated one element per pull.
  Lazy,
}

/// Strategy that turns work into a [`Completion`].
pub(crate) trait Dispatcher: Send + Sync + fmt::Debug {
  fn wait_mode(&self) -> WaitMode;

  /// Evaluation strategy for bulk results.
  fn evaluation(&self) -> Evaluation;

  fn dispatch(&self, job: Job);
}

/// Runs `work` through `dispatcher`.
///
/// Eager dispatch computes the result on the caller's thread and lets a
/// panic unwind straight into the caller. Otherwise the result (or panic) is
/// captured in the returned `Completion`.
pub(crate) fn submit<T, F>(dispatcher: &dyn Dispatcher, work: F) -> Completion<T>
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  if dispatcher.evaluation() == Evaluation::Eager {
    return Completion::ready(work());
  }
  let (promise, completion) = Completion::pending();
  dispatcher.dispatch(Box::new(move || {
    promise.complete(panic::catch_unwind(AssertUnwindSafe(work)));
  }));
  completion
}

/// Computes work immediately on the caller's thread.
#[derive(Debug, Default)]
pub(crate) struct BlockingDispatcher;

impl Dispatcher for BlockingDispatcher {
  fn wait_mode(&self) -> WaitMode {
    WaitMode::Blocking
  }

  fn evaluation(&self) -> Evaluation {
    Evaluation::Eager
  }

  fn dispatch(&self, job: Job) {
    job();
  }
}

/// Schedules work on an executor.
pub(crate) struct NonBlockingDispatcher {
  executor: Arc<dyn Executor>,
}

impl NonBlockingDispatcher {
  pub(crate) fn new(executor: Arc<dyn Executor>) -> Self {
    Self { executor }
  }
}

impl fmt::Debug for NonBlockingDispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NonBlockingDispatcher").finish_non_exhaustive()
  }
}

impl Dispatcher for NonBlockingDispatcher {
  fn wait_mode(&self) -> WaitMode {
    WaitMode::NonBlocking
  }

  fn evaluation(&self) -> Evaluation {
    Evaluation::Lazy
  }

  fn dispatch(&self, job: Job) {
    self.executor.execute(job);
  }
}

/// Picks the dispatcher for `mode`.
pub(crate) fn for_wait_mode(mode: WaitMode, executor: &Arc<dyn Executor>) -> Arc<dyn Dispatcher> {
  match mode {
    WaitMode::Blocking => Arc::new(BlockingDispatcher),
    WaitMode::NonBlocking => Arc::new(NonBlockingDispatcher::new(executor.clone())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::executor::ThreadExecutor;

  use std::sync::mpsc;
  use std::time::Duration;

  #[test]
  fn blocking_dispatch_is_already_complete() {
    let completion = submit(&BlockingDispatcher, || 40 + 2);
    assert!(completion.is_done());
    assert_eq!(completion.try_take().ok(), Some(42));
  }

  #[test]
  fn non_blocking_dispatch_completes_later() {
    let dispatcher = NonBlockingDispatcher::new(Arc::new(ThreadExecutor));
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let completion = submit(&dispatcher, move || {
      release_rx.recv_timeout(Duration::from_secs(5)).unwrap();
      "done"
    });
    let completion = completion.try_take().expect_err("work is gated on the channel");
    assert!(!completion.is_done());
    release_tx.send(()).unwrap();
    assert_eq!(completion.wait(), "done");
  }

  #[test]
  fn completion_is_awaitable() {
    let dispatcher = NonBlockingDispatcher::new(Arc::new(ThreadExecutor));
    let completion = submit(&dispatcher, || vec![1, 2, 3]);
    let value = futures_executor::block_on(completion);
    assert_eq!(value, vec![1, 2, 3]);

    let mapped = Completion::ready(2).map(|v| v * 10);
    assert_eq!(futures_executor::block_on(mapped), 20);
  }

  #[test]
  fn panic_is_resumed_by_the_consumer() {
    let dispatcher = NonBlockingDispatcher::new(Arc::new(ThreadExecutor));
    let completion = submit(&dispatcher, || -> u32 { panic!("boom") });
    let caught = panic::catch_unwind(AssertUnwindSafe(|| completion.wait()));
    let payload = caught.expect_err("panic must propagate to the waiter");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
  }

  #[test]
  #[should_panic(expected = "eager failure")]
  fn blocking_panic_unwinds_into_the_caller() {
    let _ = submit(&BlockingDispatcher, || -> u32 { panic!("eager failure") });
  }

  #[test]
  fn repeated_wakeups_queue_one_waiter() {
    let (promise, completion) = Completion::<u8>::pending();
    let slot = Arc::clone(&completion.slot);
    let waiter = thread::spawn(move || completion.wait());

    while slot.inner.lock().waiters.is_empty() {
      thread::yield_now();
    }
    for _ in 0..16 {
      waiter.thread().unpark();
      thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(slot.inner.lock().waiters.len(), 1);

    promise.complete(Ok(7));
    assert_eq!(waiter.join().unwrap(), 7);
    assert!(slot.inner.lock().waiters.is_empty());
  }

  #[test]
  fn unconsumed_panic_is_dropped_without_unwinding() {
    let dispatcher = NonBlockingDispatcher::new(Arc::new(ThreadExecutor));
    let completion = submit(&dispatcher, || -> u32 { panic!("ignored") });
    while !completion.is_done() {
      thread::yield_now();
    }
    drop(completion);
  }

  #[test]
  fn dropped_promise_fails_the_completion() {
    let (promise, completion) = Completion::<u8>::pending();
    drop(promise);
    assert!(completion.is_done());
    assert!(panic::catch_unwind(AssertUnwindSafe(|| completion.wait())).is_err());
  }
}
