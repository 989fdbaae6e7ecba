use crate::pool::PoolShared;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A borrowed instance from a `BoundedPool`.
///
/// The handle is the sole owner of the instance until it is released, either explicitly via
/// [`PooledHandle::release`] or implicitly when the handle is dropped. Either way the instance
/// goes back to the pool that issued it exactly once, whichever path the borrower's scope
/// exits by (normal completion, early return, panic or task cancellation).
#[must_use = "dropping a handle immediately returns the instance to the pool"]
pub struct PooledHandle<T: Send + 'static, E: Send + 'static> {
  value: Option<T>,
  pool: Arc<PoolShared<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> PooledHandle<T, E> {
  pub(crate) fn new(value: T, pool: Arc<PoolShared<T, E>>) -> Self {
    Self {
      value: Some(value),
      pool,
    }
  }

  /// Returns the name of the pool this instance belongs to.
  pub fn pool_name(&self) -> &str {
    self.pool.name()
  }

  pub fn value(&self) -> &T {
    self.value.as_ref().expect("pooled value is present until the handle is consumed")
  }

  pub fn value_mut(&mut self) -> &mut T {
    self.value.as_mut().expect("pooled value is present until the handle is consumed")
  }

  /// Returns the instance to the pool now rather than at the end of the scope.
  pub fn release(mut self) {
    self.return_to_pool();
  }

  /// Takes the instance out of the pool for good.
  ///
  /// The capacity it occupied is freed, so the pool may create a replacement.
  pub fn detach(mut self) -> T {
    let value = self
      .value
      .take()
      .expect("pooled value is present until the handle is consumed");
    tracing::debug!(pool_name = %self.pool.name(), "Instance detached from pool.");
    self.pool.forfeit_slot();
    value
  }

  /// Hands the instance back to the pool. Subsequent calls are no-ops.
  fn return_to_pool(&mut self) {
    match self.value.take() {
      Some(value) => {
        tracing::trace!(pool_name = %self.pool.name(), "Returning instance to pool.");
        self.pool.give_back(value);
      }
      None => {
        tracing::trace!(pool_name = %self.pool.name(), "Handle already released, nothing to return.");
      }
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> Deref for PooledHandle<T, E> {
  type Target = T;

  fn deref(&self) -> &Self::Target {
    self.value()
  }
}

impl<T: Send + 'static, E: Send + 'static> DerefMut for PooledHandle<T, E> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    self.value_mut()
  }
}

impl<T: Send + 'static, E: Send + 'static> Drop for PooledHandle<T, E> {
  fn drop(&mut self) {
    self.return_to_pool();
  }
}

impl<T: fmt::Debug + Send + 'static, E: Send + 'static> fmt::Debug for PooledHandle<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PooledHandle")
      .field("pool_name", self.pool.name())
      .field("value", &self.value)
      .finish()
  }
}
