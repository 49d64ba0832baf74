//! Compare-and-set authorities.

use futures::future::{self, BoxFuture, Future, FutureExt};

/// External authority deciding the transitions of a [`Dynamic`].
///
/// `compare_and_set(expected, new)` resolves to `true` iff the authority
/// atomically replaced `expected` with `new`. A successful transition is
/// expected to be broadcast back through the publisher of the cell, which is
/// the only way the cell's cached value changes.
///
/// Implemented for closures `Fn(T, T) -> impl Future<Output = bool>`.
///
/// [`Dynamic`]: super::Dynamic
pub trait CompareAndSet<T>: Send + Sync {
  fn compare_and_set(&self, expected: T, new: T) -> BoxFuture<'static, bool>;
}

impl<T, F, Fut> CompareAndSet<T> for F
where
  F: Fn(T, T) -> Fut + Send + Sync,
  Fut: Future<Output = bool> + Send + 'static,
{
  #[inline]
  fn compare_and_set(&self, expected: T, new: T) -> BoxFuture<'static, bool> {
    self(expected, new).boxed()
  }
}

/// Authority backed by a synchronous `Fn(T, T) -> bool`.
#[derive(Clone)]
pub struct SyncCompareAndSet<F>(F);

/// Adapts a synchronous compare-and-set function.
pub fn sync<T, F>(f: F) -> SyncCompareAndSet<F>
where
  F: Fn(T, T) -> bool + Send + Sync,
{
  SyncCompareAndSet(f)
}

impl<T, F> CompareAndSet<T> for SyncCompareAndSet<F>
where
  F: Fn(T, T) -> bool + Send + Sync,
{
  fn compare_and_set(&self, expected: T, new: T) -> BoxFuture<'static, bool> {
    future::ready((self.0)(expected, new)).boxed()
  }
}

/// Authority rejecting every transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Impossible;

/// An authority that never succeeds, for cells that are read-only.
pub fn impossible() -> Impossible { Impossible }

impl<T> CompareAndSet<T> for Impossible {
  #[inline]
  fn compare_and_set(&self, _expected: T, _new: T) -> BoxFuture<'static, bool> {
    future::ready(false).boxed()
  }
}
