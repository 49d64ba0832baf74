//! Observable mutable set.
//!
//! An [`ObservableSet`] is a `HashSet` that publishes every membership change
//! to its subscribers as an [`Update`]. Each mutating call emits at most one
//! update, holding exactly the elements whose membership changed. Calls that
//! change nothing emit nothing.
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use rxcell::prelude::*;
//!
//! let log = Rc::new(RefCell::new(vec![]));
//! let c_log = log.clone();
//!
//! let mut online = ObservableSet::new();
//! online.subscribe(&MutRc::own(subscriber_fn(move |u: Update<&str>| {
//!   c_log.borrow_mut().push((u.action(), u.elements().len()))
//! })));
//!
//! online.add("alex");
//! online.add("alex");
//! online.add_all(["alex", "steve", "sam"]);
//! online.remove(&"sam");
//!
//! assert_eq!(*log.borrow(), vec![(Action::Add, 1), (Action::Add, 2), (Action::Remove, 1)]);
//! ```

mod cursor;
mod elements;
mod update;

use std::{
  collections::{hash_set, HashSet},
  convert::Infallible,
  fmt,
  hash::Hash,
};

pub use cursor::Cursor;
pub use elements::{ElementCollection, ElementSet};
use tracing::trace;
pub use update::{Action, Update};

use crate::{processor::Processor, rc::MutRc, subscriber::Subscriber};

/// A set publishing its membership changes.
///
/// Like the [`Processor`] it publishes through, the set is confined to one
/// thread. Subscribers are notified synchronously, before the mutating call
/// returns.
pub struct ObservableSet<T: Eq + Hash + Clone + 'static> {
  elements: HashSet<T>,
  processor: Processor<Update<T>>,
}

impl<T: Eq + Hash + Clone + 'static> ObservableSet<T> {
  pub fn new() -> Self { Self::from_set(HashSet::new()) }

  pub fn with_capacity(capacity: usize) -> Self { Self::from_set(HashSet::with_capacity(capacity)) }

  /// Wraps an existing set. Its elements are not published.
  pub fn from_set(elements: HashSet<T>) -> Self { Self { elements, processor: Processor::new() } }

  // ==========================================================================
  // Subscription
  // ==========================================================================

  /// Subscribes to the updates of this set, see [`Processor::subscribe`].
  pub fn subscribe<S>(&self, subscriber: &MutRc<S>)
  where
    S: Subscriber<Update<T>, Infallible> + 'static,
  {
    self.processor.subscribe(subscriber)
  }

  /// The processor updates are published through.
  pub fn publisher(&self) -> Processor<Update<T>> { self.processor.clone() }

  // ==========================================================================
  // Reads
  // ==========================================================================

  #[inline]
  pub fn contains(&self, element: &T) -> bool { self.elements.contains(element) }

  pub fn contains_all<C>(&self, other: &C) -> bool
  where
    C: ElementCollection<T> + ?Sized,
  {
    other.elements().all(|element| self.elements.contains(element))
  }

  #[inline]
  pub fn len(&self) -> usize { self.elements.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.elements.is_empty() }

  #[inline]
  pub fn iter(&self) -> hash_set::Iter<'_, T> { self.elements.iter() }

  #[inline]
  pub fn as_set(&self) -> &HashSet<T> { &self.elements }

  /// An immutable copy of the current elements.
  pub fn to_element_set(&self) -> ElementSet<T> {
    ElementSet::from_distinct(self.elements.iter().cloned().collect())
  }

  /// A cursor whose [`remove`](Cursor::remove) publishes the removal.
  pub fn cursor(&mut self) -> Cursor<'_, T> { Cursor::new(self) }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  /// Adds `element`, returning whether it was absent.
  pub fn add(&mut self, element: T) -> bool {
    if !self.elements.insert(element.clone()) {
      return false;
    }
    self.publish(Action::Add, ElementSet::of(element));
    true
  }

  /// Removes `element`, returning whether it was present.
  pub fn remove(&mut self, element: &T) -> bool {
    match self.elements.take(element) {
      Some(removed) => {
        self.publish(Action::Remove, ElementSet::of(removed));
        true
      }
      None => false,
    }
  }

  /// Adds every element, publishing one update with the ones that were
  /// absent. Returns whether the set changed.
  pub fn add_all<I: IntoIterator<Item = T>>(&mut self, elements: I) -> bool {
    let added: Vec<T> = elements
      .into_iter()
      .filter(|element| self.elements.insert(element.clone()))
      .collect();
    self.publish_batch(Action::Add, added)
  }

  /// Removes every element of `other`, publishing one update with the ones
  /// that were present. Returns whether the set changed.
  pub fn remove_all<C>(&mut self, other: &C) -> bool
  where
    C: ElementCollection<T> + ?Sized,
  {
    let removed: Vec<T> = if other.element_count() < self.elements.len() {
      other.elements().filter_map(|element| self.elements.take(element)).collect()
    } else {
      self.extract(|element| other.contains_element(element))
    };
    self.publish_batch(Action::Remove, removed)
  }

  /// Removes every element not in `other`, publishing one update with the
  /// removed ones. Returns whether the set changed.
  pub fn retain_all<C>(&mut self, other: &C) -> bool
  where
    C: ElementCollection<T> + ?Sized,
  {
    let removed = self.extract(|element| !other.contains_element(element));
    self.publish_batch(Action::Remove, removed)
  }

  /// Removes every element matching `predicate`, publishing one update with
  /// the removed ones. Returns whether the set changed.
  pub fn remove_if<F: FnMut(&T) -> bool>(&mut self, predicate: F) -> bool {
    let removed = self.extract(predicate);
    self.publish_batch(Action::Remove, removed)
  }

  /// Removes everything, publishing one update if the set was not empty.
  pub fn clear(&mut self) {
    let removed: Vec<T> = self.elements.drain().collect();
    self.publish_batch(Action::Remove, removed);
  }

  fn extract<F: FnMut(&T) -> bool>(&mut self, mut predicate: F) -> Vec<T> {
    let mut removed = vec![];
    self.elements.retain(|element| {
      let matched = predicate(element);
      if matched {
        removed.push(element.clone());
      }
      !matched
    });
    removed
  }

  fn publish_batch(&self, action: Action, changed: Vec<T>) -> bool {
    if changed.is_empty() {
      return false;
    }
    self.publish(action, ElementSet::from_distinct(changed));
    true
  }

  fn publish(&self, action: Action, elements: ElementSet<T>) {
    trace!(?action, changed = elements.len(), "set membership changed");
    self.processor.next(Update::new(action, elements));
  }
}

impl<T: Eq + Hash + Clone + 'static> Default for ObservableSet<T> {
  fn default() -> Self { Self::new() }
}

impl<T: Eq + Hash + Clone + fmt::Debug + 'static> fmt::Debug for ObservableSet<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObservableSet")
      .field("elements", &self.elements)
      .field("subscribers", &self.processor.subscriber_count())
      .finish()
  }
}

impl<'a, T: Eq + Hash + Clone + 'static> IntoIterator for &'a ObservableSet<T> {
  type Item = &'a T;
  type IntoIter = hash_set::Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter { self.iter() }
}
