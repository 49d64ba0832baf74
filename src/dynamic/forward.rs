use std::{
  future::Future,
  pin::Pin,
  task::{Context, Poll},
};

use futures::{ready, Stream};
use pin_project_lite::pin_project;
use tracing::{debug, error};

use super::ReplayLatest;

pin_project! {
  /// Future pumping a publisher stream into a [`ReplayLatest`].
  ///
  /// Every `Ok` item is emitted as a value. The first `Err` item terminates
  /// the channel with that error, the end of the stream completes it. Either
  /// way the future resolves and stops polling the publisher.
  #[must_use = "futures do nothing unless polled"]
  pub struct Forward<S, T, E> {
    #[pin]
    publisher: S,
    replay: Option<ReplayLatest<T, E>>,
  }
}

impl<S, T, E> Forward<S, T, E> {
  pub(crate) fn new(publisher: S, replay: ReplayLatest<T, E>) -> Self {
    Self { publisher, replay: Some(replay) }
  }
}

impl<S, T, E> Future for Forward<S, T, E>
where
  S: Stream<Item = Result<T, E>>,
  T: Clone,
  E: Clone,
{
  type Output = ();

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    loop {
      let this = self.as_mut().project();
      let Some(replay) = this.replay.as_ref() else { return Poll::Ready(()) };

      let emitted = match ready!(this.publisher.poll_next(cx)) {
        Some(Ok(value)) => replay.try_next(value),
        Some(Err(err)) => {
          debug!("publisher failed, terminating the replay channel");
          let emitted = replay.try_error(err);
          *this.replay = None;
          emitted
        }
        None => {
          debug!("publisher ended, completing the replay channel");
          let emitted = replay.try_complete();
          *this.replay = None;
          emitted
        }
      };

      // The channel may have been terminated by someone else.
      if let Err(err) = emitted {
        error!(%err, "publisher kept emitting into a terminated replay channel");
        *this.replay = None;
      }
    }
  }
}
