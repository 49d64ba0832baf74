//! Prelude module for convenient imports

pub use crate::{
  dynamic::{cas, CompareAndSet, Dynamic, Forward, ReplayLatest, Updates},
  error::EmitError,
  processor::{MemoizingProcessor, Processor, ProcessorSubscription},
  rc::{MutArc, MutRc, RcDeref, RcDerefMut, WeakMutRc},
  set::{Action, Cursor, ElementCollection, ElementSet, ObservableSet, Update},
  subscriber::{
    memoizing, subscriber_fn, subscriber_fn_err, DelegatingSubscriber, FnSubscriber,
    MemoizingSubscriber, Subscriber, Subscription, SubscriptionRef,
  },
};
