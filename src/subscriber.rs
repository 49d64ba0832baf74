//! Subscriber and subscription contracts.
//!
//! A [`Subscriber`] consumes the signals of a [`Processor`]: first one
//! `on_subscribe` carrying its [`Subscription`], then any number of `next`
//! values, and possibly `error` or `complete`. Subscribers are registered by
//! identity, through a [`MutRc`](crate::rc::MutRc) handle.
//!
//! [`Processor`]: crate::processor::Processor

use std::{fmt::Debug, rc::Rc};

// ============================================================================
// Subscription
// ============================================================================

/// A subscriber's registration with a publisher.
///
/// Publishers in this crate push without flow control, so `request` is only
/// part of the contract for compatibility with demand-driven sources.
pub trait Subscription {
  /// Signals demand for `amount` more values.
  fn request(&self, amount: usize);

  /// Stops delivery to the subscriber. Idempotent.
  fn cancel(&self);

  fn is_cancelled(&self) -> bool;
}

/// Shared handle to a subscription, as passed to `on_subscribe`.
pub type SubscriptionRef = Rc<dyn Subscription>;

// ============================================================================
// Subscriber
// ============================================================================

/// Receiver of a sequence of values followed by an optional terminal signal.
///
/// Unlike [`Observer`]-style consumers, terminal signals take `&mut self`:
/// a processor keeps its subscribers registered after `error` or `complete`.
///
/// [`Observer`]: https://reactivex.io/documentation/observable.html
pub trait Subscriber<Item, Err> {
  /// Called once, synchronously, when the subscriber gets registered.
  fn on_subscribe(&mut self, subscription: SubscriptionRef) { let _ = subscription; }

  fn next(&mut self, value: Item);

  fn error(&mut self, err: Err);

  fn complete(&mut self);
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Forwards values to a closure.
///
/// Errors are not expected by this subscriber: receiving one panics.
#[derive(Clone)]
pub struct FnSubscriber<N>(pub N);

/// Creates a subscriber that forwards values to `next`.
///
/// Receiving an error panics, as it indicates a publisher that was not
/// supposed to fail.
pub fn subscriber_fn<N>(next: N) -> FnSubscriber<N> { FnSubscriber(next) }

impl<N, Item, Err> Subscriber<Item, Err> for FnSubscriber<N>
where
  N: FnMut(Item),
  Err: Debug,
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value) }

  fn error(&mut self, err: Err) {
    panic!("an unexpected error was passed to a subscriber: {err:?}")
  }

  #[inline]
  fn complete(&mut self) {}
}

/// Forwards values and errors to two closures.
#[derive(Clone)]
pub struct DelegatingSubscriber<N, E> {
  next: N,
  error: E,
}

/// Creates a subscriber that forwards values to `next` and errors to `error`.
pub fn subscriber_fn_err<N, E>(next: N, error: E) -> DelegatingSubscriber<N, E> {
  DelegatingSubscriber { next, error }
}

impl<N, E, Item, Err> Subscriber<Item, Err> for DelegatingSubscriber<N, E>
where
  N: FnMut(Item),
  E: FnMut(Err),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(&mut self, err: Err) { (self.error)(err) }

  #[inline]
  fn complete(&mut self) {}
}

// ============================================================================
// MemoizingSubscriber
// ============================================================================

/// Subscriber remembering the last value it received.
///
/// It also keeps the subscription handle it was given, so the owner of the
/// subscriber can cancel it later without having captured the handle.
pub struct MemoizingSubscriber<S, Item> {
  inner: S,
  last_value: Option<Item>,
  subscription: Option<SubscriptionRef>,
}

impl<S, Item> MemoizingSubscriber<S, Item> {
  pub fn new(inner: S) -> Self { Self { inner, last_value: None, subscription: None } }

  /// The last value passed to `next`, `None` if there was none.
  #[inline]
  pub fn last_value(&self) -> Option<&Item> { self.last_value.as_ref() }

  #[inline]
  pub fn subscription(&self) -> Option<&SubscriptionRef> { self.subscription.as_ref() }

  /// Cancels the subscription this subscriber was registered with, if any.
  pub fn cancel(&self) {
    if let Some(subscription) = &self.subscription {
      subscription.cancel();
    }
  }

  #[inline]
  pub fn inner(&self) -> &S { &self.inner }
}

/// Creates a memoizing subscriber that ignores values and panics on errors.
pub fn memoizing<Item>() -> MemoizingSubscriber<FnSubscriber<fn(Item)>, Item> {
  MemoizingSubscriber::new(FnSubscriber(drop::<Item> as fn(Item)))
}

impl<S, Item, Err> Subscriber<Item, Err> for MemoizingSubscriber<S, Item>
where
  S: Subscriber<Item, Err>,
  Item: Clone,
{
  fn on_subscribe(&mut self, subscription: SubscriptionRef) {
    self.subscription = Some(subscription.clone());
    self.inner.on_subscribe(subscription);
  }

  fn next(&mut self, value: Item) {
    self.last_value = Some(value.clone());
    self.inner.next(value);
  }

  #[inline]
  fn error(&mut self, err: Err) { self.inner.error(err) }

  #[inline]
  fn complete(&mut self) { self.inner.complete() }
}
