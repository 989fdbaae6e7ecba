use std::time::Duration;

use thiserror::Error;

/// Errors that can occur within the `bounded_pool` pool.
///
/// `E` is the error type of the pool's resource factory.
#[derive(Error, Debug, PartialEq)]
pub enum PoolError<E> {
  #[error("Pool capacity must be at least 1, got {0}")]
  InvalidCapacity(usize),

  #[error("Resource factory failed to create a new instance: {0}")]
  Factory(E),

  #[error("Acquire was cancelled while waiting for a pooled instance")]
  AcquireCancelled,

  #[error("Acquire timed out after {0:?} while waiting for a pooled instance")]
  AcquireTimeout(Duration),

  #[error("Pool is closed, cannot hand out instances")]
  PoolClosed,
}

impl<E> PoolError<E> {
  /// Returns `true` if this error came from the resource factory.
  pub fn is_factory_error(&self) -> bool {
    matches!(self, PoolError::Factory(_))
  }

  /// Returns the factory error, if this is one.
  pub fn into_factory_error(self) -> Option<E> {
    match self {
      PoolError::Factory(e) => Some(e),
      _ => None,
    }
  }
}
