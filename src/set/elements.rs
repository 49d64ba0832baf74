use std::{
  collections::{hash_map::DefaultHasher, hash_set, BTreeSet, HashSet},
  fmt,
  hash::{BuildHasher, Hash, Hasher},
  slice,
  sync::Arc,
};

// ============================================================================
// ElementSet
// ============================================================================

/// Immutable, duplicate-free set of elements.
///
/// Clones share the same storage. Lookups are linear: element sets are the
/// payload of update events and mostly hold one or a few elements.
///
/// Equality is set equality and does not depend on iteration order.
pub struct ElementSet<T>(Arc<[T]>);

impl<T> ElementSet<T> {
  /// A set holding exactly `element`.
  pub fn of(element: T) -> Self { Self(Arc::from([element])) }

  pub fn empty() -> Self { Self(Arc::from([])) }

  /// Wraps elements the caller already knows to be distinct.
  pub(crate) fn from_distinct(elements: Vec<T>) -> Self { Self(Arc::from(elements)) }

  #[inline]
  pub fn len(&self) -> usize { self.0.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  #[inline]
  pub fn iter(&self) -> slice::Iter<'_, T> { self.0.iter() }

  #[inline]
  pub fn as_slice(&self) -> &[T] { &self.0 }

  pub fn contains(&self, element: &T) -> bool
  where
    T: PartialEq,
  {
    self.0.contains(element)
  }

  /// Whether every element of `other` is in this set.
  pub fn contains_all<C>(&self, other: &C) -> bool
  where
    T: PartialEq,
    C: ElementCollection<T> + ?Sized,
  {
    other.elements().all(|element| self.contains(element))
  }

  pub fn to_vec(&self) -> Vec<T>
  where
    T: Clone,
  {
    self.0.to_vec()
  }
}

impl<T: Eq + Hash> FromIterator<T> for ElementSet<T> {
  fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
    let distinct: HashSet<T> = iter.into_iter().collect();
    Self::from_distinct(distinct.into_iter().collect())
  }
}

impl<T> Clone for ElementSet<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: PartialEq> PartialEq for ElementSet<T> {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
      || (self.len() == other.len() && self.iter().all(|element| other.contains(element)))
  }
}

impl<T: Eq> Eq for ElementSet<T> {}

// Combines per-element hashes commutatively, so sets equal in any order hash
// alike.
impl<T: Hash> Hash for ElementSet<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    let combined = self.iter().fold(0u64, |acc, element| {
      let mut hasher = DefaultHasher::new();
      element.hash(&mut hasher);
      acc.wrapping_add(hasher.finish())
    });
    state.write_usize(self.len());
    state.write_u64(combined);
  }
}

impl<T: fmt::Debug> fmt::Debug for ElementSet<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_set().entries(self.iter()).finish() }
}

impl<'a, T> IntoIterator for &'a ElementSet<T> {
  type Item = &'a T;
  type IntoIter = slice::Iter<'a, T>;

  fn into_iter(self) -> Self::IntoIter { self.iter() }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for ElementSet<T> {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.iter())
  }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for ElementSet<T>
where
  T: serde::Deserialize<'de> + Eq + Hash,
{
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Vec::<T>::deserialize(deserializer).map(|elements| elements.into_iter().collect())
  }
}

// ============================================================================
// ElementCollection
// ============================================================================

/// Read access to a collection of elements, as taken by the batch operations
/// of an [`ObservableSet`](super::ObservableSet).
pub trait ElementCollection<T> {
  type Elements<'a>: Iterator<Item = &'a T>
  where
    Self: 'a,
    T: 'a;

  fn contains_element(&self, element: &T) -> bool;

  /// Number of elements, duplicates included.
  fn element_count(&self) -> usize;

  fn elements(&self) -> Self::Elements<'_>;
}

impl<T: Eq + Hash, S: BuildHasher> ElementCollection<T> for HashSet<T, S> {
  type Elements<'a>
    = hash_set::Iter<'a, T>
  where
    Self: 'a,
    T: 'a;

  #[inline]
  fn contains_element(&self, element: &T) -> bool { self.contains(element) }

  #[inline]
  fn element_count(&self) -> usize { self.len() }

  #[inline]
  fn elements(&self) -> Self::Elements<'_> { self.iter() }
}

impl<T: Ord> ElementCollection<T> for BTreeSet<T> {
  type Elements<'a>
    = std::collections::btree_set::Iter<'a, T>
  where
    Self: 'a,
    T: 'a;

  #[inline]
  fn contains_element(&self, element: &T) -> bool { self.contains(element) }

  #[inline]
  fn element_count(&self) -> usize { self.len() }

  #[inline]
  fn elements(&self) -> Self::Elements<'_> { self.iter() }
}

impl<T: PartialEq> ElementCollection<T> for ElementSet<T> {
  type Elements<'a>
    = slice::Iter<'a, T>
  where
    Self: 'a,
    T: 'a;

  #[inline]
  fn contains_element(&self, element: &T) -> bool { self.contains(element) }

  #[inline]
  fn element_count(&self) -> usize { self.len() }

  #[inline]
  fn elements(&self) -> Self::Elements<'_> { self.iter() }
}

impl<T: PartialEq> ElementCollection<T> for [T] {
  type Elements<'a>
    = slice::Iter<'a, T>
  where
    Self: 'a,
    T: 'a;

  #[inline]
  fn contains_element(&self, element: &T) -> bool { self.contains(element) }

  #[inline]
  fn element_count(&self) -> usize { self.len() }

  #[inline]
  fn elements(&self) -> Self::Elements<'_> { self.iter() }
}

impl<T: PartialEq> ElementCollection<T> for Vec<T> {
  type Elements<'a>
    = slice::Iter<'a, T>
  where
    Self: 'a,
    T: 'a;

  #[inline]
  fn contains_element(&self, element: &T) -> bool { self.as_slice().contains(element) }

  #[inline]
  fn element_count(&self) -> usize { self.len() }

  #[inline]
  fn elements(&self) -> Self::Elements<'_> { self.iter() }
}
