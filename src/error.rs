//! Error types.

use thiserror::Error;

/// Emission into a replay stream that already reached a terminal state.
///
/// The stream protocol allows at most one terminal signal and nothing after
/// it, so these are caller bugs rather than contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmitError {
  #[error("the stream has already completed")]
  Completed,

  #[error("the stream has already terminated with an error")]
  Errored,
}
