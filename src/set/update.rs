use super::ElementSet;

/// Kind of membership change carried by an [`Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
  Add,
  Remove,
}

/// One membership change of an [`ObservableSet`](super::ObservableSet).
///
/// `elements` holds exactly the elements whose membership changed, never
/// an element that was already present (for `Add`) or absent (for `Remove`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound(deserialize = "T: serde::Deserialize<'de> + Eq + std::hash::Hash")))]
pub struct Update<T> {
  action: Action,
  elements: ElementSet<T>,
}

impl<T> Update<T> {
  pub fn new(action: Action, elements: ElementSet<T>) -> Self { Self { action, elements } }

  #[inline]
  pub fn action(&self) -> Action { self.action }

  #[inline]
  pub fn elements(&self) -> &ElementSet<T> { &self.elements }

  #[inline]
  pub fn into_elements(self) -> ElementSet<T> { self.elements }
}
