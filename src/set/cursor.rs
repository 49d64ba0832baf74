use std::{hash::Hash, vec};

use super::ObservableSet;

/// Iterator over an [`ObservableSet`] that can remove the element it last
/// returned, publishing the removal.
///
/// Iterates over a snapshot taken when the cursor was created, so removing
/// elements does not disturb the iteration.
pub struct Cursor<'a, T: Eq + Hash + Clone + 'static> {
  set: &'a mut ObservableSet<T>,
  remaining: vec::IntoIter<T>,
  current: Option<T>,
}

impl<'a, T: Eq + Hash + Clone + 'static> Cursor<'a, T> {
  pub(super) fn new(set: &'a mut ObservableSet<T>) -> Self {
    let remaining: Vec<T> = set.iter().cloned().collect();
    Self { set, remaining: remaining.into_iter(), current: None }
  }

  /// Removes the element returned by the last call to `next`.
  ///
  /// Returns `false` if `next` was not called yet, or the element was already
  /// removed through this cursor.
  pub fn remove(&mut self) -> bool {
    match self.current.take() {
      Some(element) => self.set.remove(&element),
      None => false,
    }
  }
}

impl<T: Eq + Hash + Clone + 'static> Iterator for Cursor<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<T> {
    let element = self.remaining.next()?;
    self.current = Some(element.clone());
    Some(element)
  }

  #[inline]
  fn size_hint(&self) -> (usize, Option<usize>) { self.remaining.size_hint() }
}
