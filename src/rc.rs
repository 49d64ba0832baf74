//! Shared mutable pointers.
//!
//! `MutRc` backs everything that is confined to one thread (processors,
//! subscribers, observable sets), `MutArc` backs the thread-safe replay state
//! of a [`Dynamic`](crate::dynamic::Dynamic). Both are accessed through the
//! same `RcDeref` / `RcDerefMut` pair so generic code does not care which one
//! it holds.

use std::{
  cell::{Ref, RefCell, RefMut},
  rc::{Rc, Weak},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub trait RcDeref {
  type Target<'a>
  where
    Self: 'a;
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a>;
}

pub trait RcDerefMut {
  type Target<'a>
  where
    Self: 'a;
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a>;
}

/// Single-threaded shared cell.
///
/// Two `MutRc`s are the same subscriber, set or processor iff they point to
/// the same allocation, see [`MutRc::ptr_eq`].
pub struct MutRc<T: ?Sized>(pub(crate) Rc<RefCell<T>>);

/// Thread-safe shared cell.
#[derive(Default)]
pub struct MutArc<T>(pub(crate) Arc<Mutex<T>>);

/// Non-owning handle to a [`MutRc`].
pub struct WeakMutRc<T: ?Sized>(Weak<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }
}

impl<T: ?Sized> MutRc<T> {
  /// Whether both handles point to the same allocation.
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  /// Address of the shared allocation, usable as an identity key.
  #[inline]
  pub(crate) fn addr(&self) -> usize { Rc::as_ptr(&self.0) as *const () as usize }

  #[inline]
  pub fn downgrade(&self) -> WeakMutRc<T> { WeakMutRc(Rc::downgrade(&self.0)) }
}

impl<T: ?Sized> WeakMutRc<T> {
  #[inline]
  pub fn upgrade(&self) -> Option<MutRc<T>> { self.0.upgrade().map(MutRc) }
}

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T: Default> Default for MutRc<T> {
  fn default() -> Self { Self::own(T::default()) }
}

impl<T> From<T> for MutRc<T> {
  fn from(t: T) -> Self { Self::own(t) }
}

impl<T> From<T> for MutArc<T> {
  fn from(t: T) -> Self { Self::own(t) }
}

impl<T: ?Sized> RcDeref for MutRc<T> {
  type Target<'a>
    = Ref<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a> { self.0.borrow() }
}

// Poisoned locks are recovered: every writer leaves the state consistent
// before it calls out to user code.
impl<T> RcDeref for MutArc<T> {
  type Target<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<T: ?Sized> RcDerefMut for MutRc<T> {
  type Target<'a>
    = RefMut<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a> { self.0.borrow_mut() }
}

impl<T> RcDerefMut for MutArc<T> {
  type Target<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<T: ?Sized> Clone for MutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: ?Sized> Clone for WeakMutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}
