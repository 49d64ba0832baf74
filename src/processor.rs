//! Broadcast processor.
//!
//! A [`Processor`] is both a sink for signals and a broadcaster of those
//! signals to its subscribers. It pushes without flow control: every `next`
//! reaches every registered subscriber synchronously, on the caller's stack.
//!
//! # Threading
//!
//! Processors are confined to one thread. The type is built on `Rc` and
//! `RefCell` and therefore `!Send`; callers serialize access themselves,
//! typically by driving everything from a single main loop.
//!
//! # Re-entrancy
//!
//! The registry is not borrowed while callbacks run. A subscriber may
//! subscribe or cancel from inside its own callback; the change takes effect
//! from the next emission on. Emitting into the same subscriber recursively
//! from its own callback panics, as its `RefCell` is already borrowed.
//!
//! # Example
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxcell::prelude::*;
//!
//! let seen = Rc::new(RefCell::new(vec![]));
//! let c_seen = seen.clone();
//!
//! let processor = Processor::<i32>::new();
//! processor.subscribe(&MutRc::own(subscriber_fn(move |v| c_seen.borrow_mut().push(v))));
//!
//! processor.next(1);
//! processor.next(2);
//! assert_eq!(*seen.borrow(), vec![1, 2]);
//! ```

mod subscribers;
mod subscription;

use std::{cell::RefCell, convert::Infallible, rc::Rc};

pub use subscription::ProcessorSubscription;
use subscribers::{Subscribers, Targets};
use tracing::{debug, trace};

use crate::{
  rc::{MutRc, RcDeref, RcDerefMut},
  subscriber::{Subscriber, SubscriptionRef},
};

// ============================================================================
// Processor
// ============================================================================

/// Thread-confined fan-out of values, errors and completion.
///
/// Clones share the same subscriber registry.
pub struct Processor<Item, Err = Infallible> {
  subscribers: MutRc<Subscribers<Item, Err>>,
}

impl<Item, Err> Processor<Item, Err> {
  pub fn new() -> Self { Self { subscribers: MutRc::own(Subscribers::default()) } }

  /// Registers `subscriber` unless it is registered already.
  ///
  /// A new registration synchronously receives its subscription through
  /// `on_subscribe`. Subscribing the same handle (or a clone of it) again
  /// has no effect.
  pub fn subscribe<S>(&self, subscriber: &MutRc<S>)
  where
    S: Subscriber<Item, Err> + 'static,
    Item: 'static,
    Err: 'static,
  {
    let key = subscriber.addr();
    let id = {
      let mut subscribers = self.subscribers.rc_deref_mut();
      if subscribers.contains_key(key) {
        trace!(key, "subscriber already registered");
        return;
      }
      let erased: Rc<RefCell<dyn Subscriber<Item, Err>>> = subscriber.0.clone();
      subscribers.add(key, MutRc(erased))
    };
    debug!(id, "processor subscriber registered");

    let subscription: SubscriptionRef =
      Rc::new(ProcessorSubscription::new(self.subscribers.downgrade(), id));
    subscriber.rc_deref_mut().on_subscribe(subscription);
  }

  /// Delivers `value` to every subscriber, in registration order.
  ///
  /// The value is cloned for all subscribers but the last, which receives
  /// the moved value.
  pub fn next(&self, value: Item)
  where
    Item: Clone,
  {
    let targets = self.targets();
    trace!(subscribers = targets.len(), "broadcasting value");

    let mut iter = targets.iter().peekable();
    while let Some(subscriber) = iter.next() {
      if iter.peek().is_some() {
        subscriber.rc_deref_mut().next(value.clone());
      } else {
        subscriber.rc_deref_mut().next(value);
        break;
      }
    }
  }

  /// Delivers `err` to every subscriber. Subscribers stay registered.
  pub fn error(&self, err: Err)
  where
    Err: Clone,
  {
    let targets = self.targets();
    debug!(subscribers = targets.len(), "broadcasting error");

    let mut iter = targets.iter().peekable();
    while let Some(subscriber) = iter.next() {
      if iter.peek().is_some() {
        subscriber.rc_deref_mut().error(err.clone());
      } else {
        subscriber.rc_deref_mut().error(err);
        break;
      }
    }
  }

  /// Delivers completion to every subscriber. Subscribers stay registered.
  pub fn complete(&self) {
    let targets = self.targets();
    debug!(subscribers = targets.len(), "broadcasting completion");

    for subscriber in targets.iter() {
      subscriber.rc_deref_mut().complete();
    }
  }

  /// Number of registered subscribers.
  pub fn subscriber_count(&self) -> usize { self.subscribers.rc_deref().len() }

  pub fn is_empty(&self) -> bool { self.subscribers.rc_deref().is_empty() }

  #[inline]
  fn targets(&self) -> Targets<Item, Err> { self.subscribers.rc_deref().targets() }
}

impl<Item, Err> Default for Processor<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Clone for Processor<Item, Err> {
  fn clone(&self) -> Self { Self { subscribers: self.subscribers.clone() } }
}

// A processor subscribed to another publisher re-broadcasts its signals.
impl<Item, Err> Subscriber<Item, Err> for Processor<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  #[inline]
  fn next(&mut self, value: Item) { Processor::next(self, value) }

  #[inline]
  fn error(&mut self, err: Err) { Processor::error(self, err) }

  #[inline]
  fn complete(&mut self) { Processor::complete(self) }
}

// ============================================================================
// MemoizingProcessor
// ============================================================================

/// A [`Processor`] remembering the last value passed to `next`.
pub struct MemoizingProcessor<Item, Err = Infallible> {
  processor: Processor<Item, Err>,
  last_value: MutRc<Option<Item>>,
}

impl<Item, Err> MemoizingProcessor<Item, Err> {
  pub fn new() -> Self { Self { processor: Processor::new(), last_value: MutRc::own(None) } }

  /// See [`Processor::subscribe`].
  #[inline]
  pub fn subscribe<S>(&self, subscriber: &MutRc<S>)
  where
    S: Subscriber<Item, Err> + 'static,
    Item: 'static,
    Err: 'static,
  {
    self.processor.subscribe(subscriber)
  }

  pub fn next(&self, value: Item)
  where
    Item: Clone,
  {
    *self.last_value.rc_deref_mut() = Some(value.clone());
    self.processor.next(value);
  }

  #[inline]
  pub fn error(&self, err: Err)
  where
    Err: Clone,
  {
    self.processor.error(err)
  }

  #[inline]
  pub fn complete(&self) { self.processor.complete() }

  /// The last value passed to `next`, `None` before the first one.
  pub fn last_value(&self) -> Option<Item>
  where
    Item: Clone,
  {
    self.last_value.rc_deref().clone()
  }

  #[inline]
  pub fn subscriber_count(&self) -> usize { self.processor.subscriber_count() }
}

impl<Item, Err> Default for MemoizingProcessor<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Clone for MemoizingProcessor<Item, Err> {
  fn clone(&self) -> Self {
    Self { processor: self.processor.clone(), last_value: self.last_value.clone() }
  }
}

impl<Item, Err> Subscriber<Item, Err> for MemoizingProcessor<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  #[inline]
  fn next(&mut self, value: Item) { MemoizingProcessor::next(self, value) }

  #[inline]
  fn error(&mut self, err: Err) { MemoizingProcessor::error(self, err) }

  #[inline]
  fn complete(&mut self) { MemoizingProcessor::complete(self) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscriber::{subscriber_fn, Subscription};

  #[derive(Default)]
  struct Recorder {
    subscribed: usize,
    values: Vec<i32>,
    errors: Vec<&'static str>,
    completed: usize,
    subscription: Option<SubscriptionRef>,
  }

  impl Subscriber<i32, &'static str> for Recorder {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
      self.subscribed += 1;
      self.subscription = Some(subscription);
    }

    fn next(&mut self, value: i32) { self.values.push(value); }

    fn error(&mut self, err: &'static str) { self.errors.push(err); }

    fn complete(&mut self) { self.completed += 1; }
  }

  fn recorder() -> MutRc<Recorder> { MutRc::own(Recorder::default()) }

  #[rxcell_macro::test]
  fn delivers_to_every_subscriber() {
    let processor = Processor::<i32, &'static str>::new();
    let a = recorder();
    let b = recorder();
    processor.subscribe(&a);
    processor.subscribe(&b);

    processor.next(1);
    processor.next(2);

    assert_eq!(a.rc_deref().values, vec![1, 2]);
    assert_eq!(b.rc_deref().values, vec![1, 2]);
    assert_eq!(processor.subscriber_count(), 2);
  }

  #[rxcell_macro::test]
  fn resubscribing_is_idempotent() {
    let processor = Processor::<i32, &'static str>::new();
    let a = recorder();

    processor.subscribe(&a);
    assert_eq!(a.rc_deref().subscribed, 1);
    assert!(a.rc_deref().values.is_empty());

    processor.subscribe(&a);
    processor.subscribe(&a.clone());
    assert_eq!(a.rc_deref().subscribed, 1);
    assert_eq!(processor.subscriber_count(), 1);

    processor.next(5);
    assert_eq!(a.rc_deref().values, vec![5]);
  }

  #[rxcell_macro::test]
  fn cancel_stops_only_that_subscriber() {
    let processor = Processor::<i32, &'static str>::new();
    let a = recorder();
    let b = recorder();
    processor.subscribe(&a);
    processor.subscribe(&b);

    processor.next(1);
    let subscription = a.rc_deref().subscription.clone().unwrap();
    subscription.cancel();
    assert!(subscription.is_cancelled());
    processor.next(2);
    processor.next(3);

    assert_eq!(a.rc_deref().values, vec![1]);
    assert_eq!(b.rc_deref().values, vec![1, 2, 3]);
    assert_eq!(processor.subscriber_count(), 1);

    // second cancel is a no-op
    subscription.cancel();
    assert_eq!(processor.subscriber_count(), 1);
  }

  #[rxcell_macro::test]
  fn request_is_a_no_op() {
    let processor = Processor::<i32, &'static str>::new();
    let a = recorder();
    processor.subscribe(&a);

    let subscription = a.rc_deref().subscription.clone().unwrap();
    subscription.request(0);
    processor.next(1);
    assert_eq!(a.rc_deref().values, vec![1]);
  }

  #[rxcell_macro::test]
  fn resubscribing_after_cancel_registers_again() {
    let processor = Processor::<i32, &'static str>::new();
    let a = recorder();
    processor.subscribe(&a);
    a.rc_deref().subscription.clone().unwrap().cancel();

    processor.subscribe(&a);
    assert_eq!(a.rc_deref().subscribed, 2);
    processor.next(9);
    assert_eq!(a.rc_deref().values, vec![9]);
  }

  #[rxcell_macro::test]
  fn terminal_signals_keep_subscribers() {
    let processor = Processor::<i32, &'static str>::new();
    let a = recorder();
    let b = recorder();
    processor.subscribe(&a);
    processor.subscribe(&b);

    processor.error("broken");
    processor.complete();
    processor.next(4);

    for r in [&a, &b] {
      let r = r.rc_deref();
      assert_eq!(r.errors, vec!["broken"]);
      assert_eq!(r.completed, 1);
      assert_eq!(r.values, vec![4]);
    }
  }

  #[rxcell_macro::test]
  fn cancel_from_inside_callback() {
    struct CancelOnFirst {
      subscription: Option<SubscriptionRef>,
      seen: Rc<RefCell<Vec<i32>>>,
    }

    impl Subscriber<i32, Infallible> for CancelOnFirst {
      fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        self.subscription = Some(subscription);
      }

      fn next(&mut self, value: i32) {
        self.seen.borrow_mut().push(value);
        if let Some(subscription) = &self.subscription {
          subscription.cancel();
        }
      }

      fn error(&mut self, _: Infallible) {}

      fn complete(&mut self) {}
    }

    let seen = Rc::new(RefCell::new(vec![]));
    let processor = Processor::<i32>::new();
    processor.subscribe(&MutRc::own(CancelOnFirst { subscription: None, seen: seen.clone() }));

    processor.next(1);
    processor.next(2);
    assert_eq!(*seen.borrow(), vec![1]);
    assert!(processor.is_empty());
  }

  #[rxcell_macro::test]
  fn cancel_after_processor_dropped() {
    let a = recorder();
    {
      let processor = Processor::<i32, &'static str>::new();
      processor.subscribe(&a);
    }
    let subscription = a.rc_deref().subscription.clone().unwrap();
    subscription.cancel();
    assert!(subscription.is_cancelled());
  }

  #[rxcell_macro::test]
  fn processors_chain() {
    let upstream = Processor::<i32, &'static str>::new();
    let downstream = MutRc::own(Processor::<i32, &'static str>::new());
    let a = recorder();
    downstream.rc_deref().subscribe(&a);
    upstream.subscribe(&downstream);

    upstream.next(7);
    upstream.error("late");
    assert_eq!(a.rc_deref().values, vec![7]);
    assert_eq!(a.rc_deref().errors, vec!["late"]);
  }

  #[rxcell_macro::test]
  fn memoizing_processor_remembers_last_value() {
    let processor = MemoizingProcessor::<i32>::new();
    assert_eq!(processor.last_value(), None);

    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    processor.subscribe(&MutRc::own(subscriber_fn(move |v| c_seen.borrow_mut().push(v))));

    processor.next(1);
    processor.next(2);
    assert_eq!(processor.last_value(), Some(2));
    assert_eq!(processor.clone().last_value(), Some(2));
    assert_eq!(*seen.borrow(), vec![1, 2]);
  }
}
