use smallvec::SmallVec;

use crate::{rc::MutRc, subscriber::Subscriber};

/// Type-erased, identity-carrying handle to a registered subscriber.
pub(crate) type SubscriberRef<Item, Err> = MutRc<dyn Subscriber<Item, Err>>;

/// Delivery targets of one emission.
pub(crate) type Targets<Item, Err> = SmallVec<[SubscriberRef<Item, Err>; 2]>;

struct Entry<Item, Err> {
  id: usize,
  key: usize,
  subscriber: SubscriberRef<Item, Err>,
}

/// Registry of the subscribers of a processor.
///
/// Every entry carries two keys: the `id` handed out to its subscription for
/// removal, and the `key` identifying the subscriber allocation, which keeps
/// a subscriber from being registered twice.
///
/// Uses `SmallVec<[_; 2]>` as most processors have one or two subscribers.
pub(crate) struct Subscribers<Item, Err> {
  next_id: usize,
  entries: SmallVec<[Entry<Item, Err>; 2]>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { next_id: 0, entries: SmallVec::new() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  /// Adds a subscriber and returns its id.
  ///
  /// The caller checks [`contains_key`](Self::contains_key) first.
  pub(crate) fn add(&mut self, key: usize, subscriber: SubscriberRef<Item, Err>) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.entries.push(Entry { id, key, subscriber });
    id
  }

  /// Removes the subscriber registered under `id`.
  pub(crate) fn remove(&mut self, id: usize) -> Option<SubscriberRef<Item, Err>> {
    self
      .entries
      .iter()
      .position(|entry| entry.id == id)
      .map(|pos| self.entries.remove(pos).subscriber)
  }

  #[inline]
  pub(crate) fn contains_key(&self, key: usize) -> bool {
    self.entries.iter().any(|entry| entry.key == key)
  }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Current subscribers, in registration order.
  ///
  /// Emissions iterate over this copy so the registry is not borrowed while
  /// subscriber callbacks run.
  pub(crate) fn targets(&self) -> Targets<Item, Err> {
    self.entries.iter().map(|entry| entry.subscriber.clone()).collect()
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, convert::Infallible, rc::Rc};

  use super::*;
  use crate::subscriber::{subscriber_fn, FnSubscriber};

  fn erased(subscriber: &MutRc<FnSubscriber<fn(i32)>>) -> SubscriberRef<i32, Infallible> {
    let rc: Rc<RefCell<dyn Subscriber<i32, Infallible>>> = subscriber.0.clone();
    MutRc(rc)
  }

  #[rxcell_macro::test]
  fn ids_are_unique_and_removal_by_id() {
    let a = MutRc::own(subscriber_fn((|_| {}) as fn(i32)));
    let b = MutRc::own(subscriber_fn((|_| {}) as fn(i32)));
    let mut subscribers = Subscribers::default();

    let id_a = subscribers.add(a.addr(), erased(&a));
    let id_b = subscribers.add(b.addr(), erased(&b));
    assert_ne!(id_a, id_b);
    assert_eq!(subscribers.len(), 2);
    assert!(subscribers.contains_key(a.addr()));

    assert!(subscribers.remove(id_a).is_some());
    assert!(subscribers.remove(id_a).is_none());
    assert!(!subscribers.contains_key(a.addr()));
    assert!(subscribers.contains_key(b.addr()));
    assert_eq!(subscribers.targets().len(), 1);

    subscribers.remove(id_b);
    assert!(subscribers.is_empty());
  }
}
