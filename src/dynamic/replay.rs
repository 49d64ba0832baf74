use std::{
  convert::Infallible,
  fmt::Debug,
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
  Stream,
};
use smallvec::SmallVec;
use tracing::{debug, error, trace};

use crate::{
  error::EmitError,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscriber::Subscriber,
};

type Sender<T, E> = UnboundedSender<Result<T, E>>;

enum Terminal<E> {
  Completed,
  Errored(E),
}

struct State<T, E> {
  latest: T,
  version: u64,
  terminal: Option<Terminal<E>>,
  senders: SmallVec<[Sender<T, E>; 2]>,
}

/// Multicast channel replaying its latest value to every new subscriber.
///
/// Always holds a value: it is seeded on construction. Clones share the same
/// channel, and the channel is `Send + Sync` when `T` and `E` are.
///
/// After a terminal signal the latest value is still replayed, followed by
/// the error if there was one.
pub struct ReplayLatest<T, E = Infallible> {
  state: MutArc<State<T, E>>,
}

impl<T, E> ReplayLatest<T, E> {
  pub fn new(initial: T) -> Self {
    Self {
      state: MutArc::own(State {
        latest: initial,
        version: 0,
        terminal: None,
        senders: SmallVec::new(),
      }),
    }
  }

  pub fn latest(&self) -> T
  where
    T: Clone,
  {
    self.state.rc_deref().latest.clone()
  }

  /// Number of values emitted after the initial one.
  pub fn version(&self) -> u64 { self.state.rc_deref().version }

  pub fn is_terminated(&self) -> bool { self.state.rc_deref().terminal.is_some() }

  /// Number of live [`Updates`] streams.
  pub fn subscriber_count(&self) -> usize {
    let mut state = self.state.rc_deref_mut();
    state.senders.retain(|tx| !tx.is_closed());
    state.senders.len()
  }

  /// Replaces the latest value and delivers it to every subscriber.
  pub fn try_next(&self, value: T) -> Result<(), EmitError>
  where
    T: Clone,
  {
    let mut state = self.state.rc_deref_mut();
    check_open(&state.terminal)?;

    state.version += 1;
    state.senders.retain(|tx| tx.unbounded_send(Ok(value.clone())).is_ok());
    trace!(version = state.version, subscribers = state.senders.len(), "replay value emitted");
    state.latest = value;
    Ok(())
  }

  /// Terminates the channel with `err`.
  pub fn try_error(&self, err: E) -> Result<(), EmitError>
  where
    E: Clone,
  {
    let mut state = self.state.rc_deref_mut();
    check_open(&state.terminal)?;

    for tx in state.senders.drain(..) {
      let _ = tx.unbounded_send(Err(err.clone()));
    }
    state.terminal = Some(Terminal::Errored(err));
    debug!("replay channel terminated with an error");
    Ok(())
  }

  /// Completes the channel: every subscriber stream ends after the values
  /// it already received.
  pub fn try_complete(&self) -> Result<(), EmitError> {
    let mut state = self.state.rc_deref_mut();
    check_open(&state.terminal)?;

    state.senders.clear();
    state.terminal = Some(Terminal::Completed);
    debug!("replay channel completed");
    Ok(())
  }

  /// A stream of the latest value followed by every later one.
  pub fn subscribe(&self) -> Updates<T, E>
  where
    T: Clone,
    E: Clone,
  {
    let (tx, rx) = unbounded();
    let mut guard = self.state.rc_deref_mut();
    let state = &mut *guard;
    // The receiver is alive, so sending cannot fail.
    let _ = tx.unbounded_send(Ok(state.latest.clone()));
    match &state.terminal {
      None => state.senders.push(tx),
      Some(Terminal::Errored(err)) => {
        let _ = tx.unbounded_send(Err(err.clone()));
      }
      Some(Terminal::Completed) => {}
    }
    Updates { rx }
  }
}

fn check_open<E>(terminal: &Option<Terminal<E>>) -> Result<(), EmitError> {
  match terminal {
    None => Ok(()),
    Some(Terminal::Completed) => Err(EmitError::Completed),
    Some(Terminal::Errored(_)) => Err(EmitError::Errored),
  }
}

impl<T, E> Clone for ReplayLatest<T, E> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

// Lets a replay channel follow a local `Processor`. There is no caller to
// return an `EmitError` to, so protocol violations are logged.
impl<T: Clone, E: Clone> Subscriber<T, E> for ReplayLatest<T, E> {
  fn next(&mut self, value: T) {
    if let Err(err) = self.try_next(value) {
      error!(%err, "value emitted into a terminated replay channel");
    }
  }

  fn error(&mut self, err: E) {
    if let Err(err) = self.try_error(err) {
      error!(%err, "error emitted into a terminated replay channel");
    }
  }

  fn complete(&mut self) {
    if let Err(err) = self.try_complete() {
      error!(%err, "completion emitted into a terminated replay channel");
    }
  }
}

impl<T: Debug, E> Debug for ReplayLatest<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state.rc_deref();
    f.debug_struct("ReplayLatest")
      .field("latest", &state.latest)
      .field("version", &state.version)
      .field("terminated", &state.terminal.is_some())
      .finish()
  }
}

// ============================================================================
// Updates
// ============================================================================

/// Stream of the values of a [`ReplayLatest`].
///
/// Yields `Ok` values in emission order, then `Err` if the channel failed,
/// and ends once the channel is terminated.
pub struct Updates<T, E = Infallible> {
  rx: UnboundedReceiver<Result<T, E>>,
}

impl<T, E> Stream for Updates<T, E> {
  type Item = Result<T, E>;

  #[inline]
  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    Pin::new(&mut self.rx).poll_next(cx)
  }

  #[inline]
  fn size_hint(&self) -> (usize, Option<usize>) { self.rx.size_hint() }
}
