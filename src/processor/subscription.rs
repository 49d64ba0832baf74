use std::cell::Cell;

use tracing::debug;

use super::subscribers::Subscribers;
use crate::{
  rc::{RcDerefMut, WeakMutRc},
  subscriber::Subscription,
};

/// Subscription handle of a [`Processor`](super::Processor).
///
/// Holds the registry weakly: a subscriber that stores its own subscription
/// does not keep the processor alive, and cancelling after the processor was
/// dropped is a no-op.
pub struct ProcessorSubscription<Item, Err> {
  subscribers: WeakMutRc<Subscribers<Item, Err>>,
  id: usize,
  cancelled: Cell<bool>,
}

impl<Item, Err> ProcessorSubscription<Item, Err> {
  pub(crate) fn new(subscribers: WeakMutRc<Subscribers<Item, Err>>, id: usize) -> Self {
    Self { subscribers, id, cancelled: Cell::new(false) }
  }
}

impl<Item, Err> Subscription for ProcessorSubscription<Item, Err> {
  // Push-only: subscribers are always ready.
  #[inline]
  fn request(&self, _amount: usize) {}

  fn cancel(&self) {
    if self.cancelled.replace(true) {
      return;
    }
    let Some(subscribers) = self.subscribers.upgrade() else { return };

    // Bind the removed handle so the subscriber is dropped after the registry
    // borrow is released.
    let removed = subscribers.rc_deref_mut().remove(self.id);
    if removed.is_some() {
      debug!(id = self.id, "processor subscription cancelled");
    }
  }

  #[inline]
  fn is_cancelled(&self) -> bool { self.cancelled.get() }
}
