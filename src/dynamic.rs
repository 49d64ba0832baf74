//! Reactive compare-and-set cell.
//!
//! A [`Dynamic`] caches the latest value observed on a publisher and asks an
//! external [`CompareAndSet`] authority for every transition. The cell never
//! changes its own value: an accepted transition becomes visible only once the
//! authority's publisher broadcasts it.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use futures::executor::block_on;
//! use rxcell::prelude::*;
//!
//! // An authority owning the global value, broadcasting every change.
//! let global = Arc::new(Mutex::new(String::from("foo")));
//! let replay = ReplayLatest::<String>::new(String::from("foo"));
//! let c_replay = replay.clone();
//! let authority = cas::sync(move |expected: String, new: String| {
//!   let mut global = global.lock().unwrap();
//!   if *global != expected {
//!     return false;
//!   }
//!   *global = new.clone();
//!   c_replay.try_next(new).is_ok()
//! });
//!
//! let name = Dynamic::external(authority, replay);
//! let updated = block_on(name.update(|old| old + "bar"));
//! assert_eq!(updated, "foobar");
//! assert_eq!(name.snapshot(), "foobar");
//! ```

pub mod cas;
mod forward;
mod replay;

use std::{
  convert::Infallible,
  fmt,
  future::Future,
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
};

pub use cas::CompareAndSet;
pub use forward::Forward;
use futures::Stream;
pub use replay::{ReplayLatest, Updates};
use tracing::trace;

/// A value decided by an external compare-and-set authority.
///
/// Clones share the cached value and the authority. The cell is `Send` and
/// `Sync` when `T` and `E` are.
pub struct Dynamic<T, E = Infallible> {
  replay: ReplayLatest<T, E>,
  authority: Arc<dyn CompareAndSet<T>>,
}

impl<T, E> Dynamic<T, E> {
  /// A cell following `replay`, on which `authority` broadcasts the values
  /// it accepts.
  pub fn external<A>(authority: A, replay: ReplayLatest<T, E>) -> Self
  where
    A: CompareAndSet<T> + 'static,
  {
    Self { replay, authority: Arc::new(authority) }
  }

  /// A cell seeded with `initial` and following `publisher`.
  ///
  /// The returned [`Forward`] future pumps the publisher into the cell and
  /// must be driven by the caller. Until it is polled the cell only knows
  /// `initial`.
  pub fn create_external<A, S>(authority: A, publisher: S, initial: T) -> (Self, Forward<S, T, E>)
  where
    A: CompareAndSet<T> + 'static,
    S: Stream<Item = Result<T, E>>,
  {
    let replay = ReplayLatest::new(initial);
    let forward = Forward::new(publisher, replay.clone());
    (Self::external(authority, replay), forward)
  }

  /// Like [`create_external`](Self::create_external), spawning the pump on
  /// the current tokio runtime.
  ///
  /// # Panics
  ///
  /// When called outside of a tokio runtime.
  #[cfg(feature = "tokio")]
  pub fn spawn_external<A, S>(
    authority: A,
    publisher: S,
    initial: T,
  ) -> (Self, tokio::task::JoinHandle<()>)
  where
    A: CompareAndSet<T> + 'static,
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
  {
    let (dynamic, forward) = Self::create_external(authority, publisher, initial);
    (dynamic, tokio::spawn(forward))
  }

  /// The latest observed value. Never blocks.
  ///
  /// The value may be stale: a transition accepted by the authority is only
  /// visible once it was broadcast.
  #[inline]
  pub fn snapshot(&self) -> T
  where
    T: Clone,
  {
    self.replay.latest()
  }

  /// Asks the authority to replace the current value with `new`.
  ///
  /// Resolves to the authority's answer. The cached value is not changed by
  /// this call.
  pub async fn try_set(&self, new: T) -> bool
  where
    T: Clone,
  {
    self.try_set_from(self.snapshot(), new).await
  }

  async fn try_set_from(&self, expected: T, new: T) -> bool {
    self.authority.compare_and_set(expected, new).await
  }

  /// Applies `f` to the current value until the authority accepts the
  /// result, and resolves to the accepted value.
  ///
  /// `f` runs once per attempt, each time on the latest observed value, and
  /// the authority compares against that same value. Retries are unbounded and yield to the executor once in between.
  pub async fn update<F>(&self, mut f: F) -> T
  where
    F: FnMut(T) -> T,
    T: Clone,
  {
    let mut attempt: u64 = 0;
    loop {
      attempt += 1;
      // The value `f` saw is the one the authority must compare against.
      let current = self.snapshot();
      let candidate = f(current.clone());
      trace!(attempt, "compare-and-set attempt");
      if self.try_set_from(current, candidate.clone()).await {
        trace!(attempt, "compare-and-set accepted");
        return candidate;
      }
      YieldNow::default().await;
    }
  }

  /// A stream of the current value followed by every later one.
  pub fn updates(&self) -> Updates<T, E>
  where
    T: Clone,
    E: Clone,
  {
    self.replay.subscribe()
  }

  /// Number of values observed since construction.
  #[inline]
  pub fn version(&self) -> u64 { self.replay.version() }

  #[inline]
  pub fn replay(&self) -> &ReplayLatest<T, E> { &self.replay }
}

impl<T, E> Clone for Dynamic<T, E> {
  fn clone(&self) -> Self {
    Self { replay: self.replay.clone(), authority: self.authority.clone() }
  }
}

impl<T: fmt::Debug, E> fmt::Debug for Dynamic<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dynamic").field("replay", &self.replay).finish_non_exhaustive()
  }
}

/// Resolves on its second poll, letting other tasks of the executor run.
#[derive(Default)]
struct YieldNow {
  yielded: bool,
}

impl Future for YieldNow {
  type Output = ();

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    if self.yielded {
      return Poll::Ready(());
    }
    self.yielded = true;
    cx.waker().wake_by_ref();
    Poll::Pending
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
  };

  use futures::{
    channel::mpsc,
    executor::{block_on, LocalPool},
    task::LocalSpawnExt,
    StreamExt,
  };

  use super::*;

  /// Authority over a global value, broadcasting accepted transitions.
  fn atomic<T>(replay: &ReplayLatest<T>) -> impl CompareAndSet<T>
  where
    T: Clone + PartialEq + Send + 'static,
  {
    let global = Mutex::new(replay.latest());
    let replay = replay.clone();
    cas::sync(move |expected: T, new: T| {
      let mut global = global.lock().unwrap();
      if *global != expected {
        return false;
      }
      *global = new.clone();
      replay.try_next(new).unwrap();
      true
    })
  }

  #[rxcell_macro::test]
  fn accepted_values_become_visible() {
    let replay = ReplayLatest::new(1);
    let dynamic = Dynamic::external(atomic(&replay), replay);

    assert!(block_on(dynamic.try_set(2)));
    assert_eq!(dynamic.snapshot(), 2);
    assert_eq!(dynamic.version(), 1);
  }

  #[rxcell_macro::test]
  fn rejected_values_are_never_visible() {
    let dynamic = Dynamic::external(cas::impossible(), ReplayLatest::<i32>::new(1));

    assert!(!block_on(dynamic.try_set(2)));
    assert_eq!(dynamic.snapshot(), 1);
    assert_eq!(dynamic.version(), 0);
  }

  #[rxcell_macro::test]
  fn try_set_does_not_change_the_value_itself() {
    // accepts, but never broadcasts
    let dynamic = Dynamic::external(cas::sync(|_: i32, _: i32| true), ReplayLatest::<i32>::new(1));

    assert!(block_on(dynamic.try_set(2)));
    assert_eq!(dynamic.snapshot(), 1);
  }

  #[rxcell_macro::test]
  fn try_set_compares_against_the_snapshot() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let dynamic = Dynamic::external(
      move |expected: &'static str, new: &'static str| {
        c_seen.lock().unwrap().push((expected, new));
        async { false }
      },
      ReplayLatest::<&str>::new("current"),
    );

    assert!(!block_on(dynamic.try_set("next")));
    assert_eq!(*seen.lock().unwrap(), vec![("current", "next")]);
  }

  #[rxcell_macro::test]
  fn update_appends() {
    let replay = ReplayLatest::new(String::from("foo"));
    let dynamic = Dynamic::external(atomic(&replay), replay);

    assert_eq!(block_on(dynamic.update(|old| old + "bar")), "foobar");
    assert_eq!(dynamic.snapshot(), "foobar");
  }

  #[rxcell_macro::test]
  fn update_under_contention_uses_the_value_current_at_acceptance() {
    let replay = ReplayLatest::<i32>::new(0);
    let rejections = Mutex::new(3);
    let c_replay = replay.clone();
    // Rejects the first three attempts, each time because someone else wrote
    // a new value in between.
    let authority = cas::sync(move |expected: i32, new: i32| {
      let mut rejections = rejections.lock().unwrap();
      if *rejections > 0 {
        *rejections -= 1;
        c_replay.try_next(expected + 10).unwrap();
        false
      } else {
        c_replay.try_next(new).unwrap();
        true
      }
    });
    let dynamic = Dynamic::external(authority, replay);

    let calls = AtomicUsize::new(0);
    let accepted = block_on(dynamic.update(|v| {
      calls.fetch_add(1, Ordering::Relaxed);
      v + 1
    }));

    assert_eq!(accepted, 31);
    assert_eq!(calls.load(Ordering::Relaxed), 4);
    assert_eq!(dynamic.snapshot(), 31);
    assert_eq!(dynamic.version(), 4);
  }

  #[rxcell_macro::test]
  fn update_compares_against_the_value_it_transformed() {
    let replay = ReplayLatest::<i32>::new(0);
    let global = Arc::new(Mutex::new(0));
    let c_global = global.clone();
    let c_replay = replay.clone();
    let authority = cas::sync(move |expected: i32, new: i32| {
      let mut global = c_global.lock().unwrap();
      if *global != expected {
        return false;
      }
      *global = new;
      c_replay.try_next(new).unwrap();
      true
    });
    let dynamic = Dynamic::external(authority, replay.clone());

    let mut first = true;
    let result = block_on(dynamic.update(|v| {
      if first {
        first = false;
        // another writer commits and broadcasts while `f` runs
        *global.lock().unwrap() = 100;
        replay.try_next(100).unwrap();
      }
      v + 1
    }));

    assert_eq!(result, 101);
    assert_eq!(dynamic.snapshot(), 101);
    assert_eq!(*global.lock().unwrap(), 101);
  }

  #[rxcell_macro::test]
  fn update_observes_a_publisher_on_the_same_executor() {
    let (tx, rx) = mpsc::unbounded::<Result<i32, Infallible>>();
    let c_tx = tx.clone();
    let attempts = Arc::new(AtomicUsize::new(0));
    let c_attempts = attempts.clone();
    // Accepts only `expected == 5`, which only the publisher can produce.
    let authority = cas::sync(move |expected: i32, new: i32| {
      c_attempts.fetch_add(1, Ordering::Relaxed);
      if expected == 5 {
        c_tx.unbounded_send(Ok(new)).unwrap();
        true
      } else {
        false
      }
    });
    let (dynamic, forward) = Dynamic::create_external(authority, rx, 0);

    let mut pool = LocalPool::new();
    pool.spawner().spawn_local(forward).unwrap();
    tx.unbounded_send(Ok(5)).unwrap();

    let c_dynamic = dynamic.clone();
    let result = pool.run_until(async move { c_dynamic.update(|v| v * 2).await });
    pool.run_until_stalled();

    assert_eq!(result, 10);
    assert_eq!(dynamic.snapshot(), 10);
    assert!(attempts.load(Ordering::Relaxed) >= 1);
  }

  #[rxcell_macro::test]
  fn updates_replays_current_value() {
    let replay = ReplayLatest::new(1);
    let dynamic = Dynamic::external(atomic(&replay), replay);

    for _ in 0..3 {
      let mut updates = dynamic.updates();
      assert_eq!(block_on(updates.next()), Some(Ok(1)));
      assert_eq!(dynamic.snapshot(), 1);
    }

    let early = dynamic.updates();
    assert!(block_on(dynamic.try_set(2)));
    let late = dynamic.updates();
    dynamic.replay().try_complete().unwrap();

    assert_eq!(block_on(early.collect::<Vec<_>>()), vec![Ok(1), Ok(2)]);
    assert_eq!(block_on(late.collect::<Vec<_>>()), vec![Ok(2)]);
  }

  #[rxcell_macro::test]
  fn publisher_error_keeps_the_snapshot() {
    let (tx, rx) = mpsc::unbounded();
    let (dynamic, forward) =
      Dynamic::<i32, &str>::create_external(cas::impossible(), rx, 0);

    tx.unbounded_send(Ok(4)).unwrap();
    tx.unbounded_send(Err("disconnected")).unwrap();
    block_on(forward);

    assert_eq!(dynamic.snapshot(), 4);
    assert_eq!(block_on(dynamic.updates().collect::<Vec<_>>()), vec![Ok(4), Err("disconnected")]);
  }

  #[rxcell_macro::test]
  fn dynamic_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>(_: &T) {}
    let dynamic = Dynamic::external(cas::impossible(), ReplayLatest::<String>::new(String::new()));
    assert_send_sync(&dynamic);
  }
}
