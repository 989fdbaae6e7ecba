use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::factory::{boxed_factory, BoxedFactory};
use crate::handle::PooledHandle;
use crate::waiters::{Grant, WaiterQueue};

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Snapshot of a pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
  /// Maximum number of outstanding instances.
  pub capacity: usize,
  /// Instances currently borrowed, or reserved for a creation in flight.
  pub outstanding: usize,
  /// Created instances waiting on the shelf for reuse.
  pub idle: usize,
  /// Acquirers suspended at capacity.
  pub waiting: usize,
}

/// Everything guarded by the pool's single lock. Operations on it are O(1) queue and
/// counter updates; the factory is never called while it is held.
struct PoolState<T> {
  outstanding: usize,
  idle: VecDeque<T>,
  waiters: WaiterQueue<T>,
  closed: bool,
}

/// State shared between a `BoundedPool`, its clones and every handle it issued.
pub(crate) struct PoolShared<T: Send + 'static, E: Send + 'static> {
  pool_name: Arc<String>,
  capacity: usize,
  acquire_timeout: Option<Duration>,
  state: Mutex<PoolState<T>>,
  factory: BoxedFactory<T, E>,
  created_count: AtomicU64,
}

impl<T: Send + 'static, E: Send + 'static> PoolShared<T, E> {
  pub(crate) fn name(&self) -> &Arc<String> {
    &self.pool_name
  }

  /// Returns a borrowed instance. Called by handles only.
  pub(crate) fn give_back(&self, value: T) {
    let discarded = {
      let mut state = self.state.lock();
      self.settle(&mut state, Grant::Instance(value))
    };
    // Instances released after close are dropped outside the lock.
    drop(discarded);
  }

  /// Gives up a capacity slot without returning an instance (detach, failed creation).
  pub(crate) fn forfeit_slot(&self) {
    let mut state = self.state.lock();
    let _ = self.settle(&mut state, Grant::Slot);
  }

  /// Passes a grant to the oldest live waiter, or releases its capacity.
  ///
  /// Returns an instance the caller must drop once the lock is released.
  fn settle(&self, state: &mut PoolState<T>, grant: Grant<T>) -> Option<T> {
    if state.closed {
      state.outstanding -= 1;
      trace!(pool_name = %self.pool_name, outstanding = state.outstanding, "Pool closed, discarding returned grant.");
      return match grant {
        Grant::Instance(value) => Some(value),
        Grant::Slot => None,
      };
    }

    match state.waiters.grant(grant) {
      Ok(waiter_id) => {
        trace!(pool_name = %self.pool_name, waiter_id, "Handed grant directly to oldest waiter.");
        None
      }
      Err(Grant::Instance(value)) => {
        state.outstanding -= 1;
        state.idle.push_back(value);
        trace!(pool_name = %self.pool_name, outstanding = state.outstanding, idle = state.idle.len(), "Instance returned to idle queue.");
        None
      }
      Err(Grant::Slot) => {
        state.outstanding -= 1;
        trace!(pool_name = %self.pool_name, outstanding = state.outstanding, "Capacity slot released.");
        None
      }
    }
  }

  /// Cleanup for a waiter whose acquire was dropped before it observed its grant.
  fn abandon_wait(&self, waiter_id: u64, rx: &mut oneshot::Receiver<Grant<T>>) {
    let discarded = {
      let mut state = self.state.lock();
      if state.waiters.remove(waiter_id) {
        debug!(pool_name = %self.pool_name, waiter_id, "Acquire cancelled while queued, waiter removed.");
        return;
      }

      // Grants are sent under this lock, so whatever a release handed us is already in the
      // channel. Take it back and pass it on to the next waiter.
      rx.close();
      match rx.try_recv() {
        Ok(grant) => {
          debug!(pool_name = %self.pool_name, waiter_id, "Acquire cancelled after being served, re-releasing grant.");
          self.settle(&mut state, grant)
        }
        Err(_) => None,
      }
    };
    drop(discarded);
  }

  /// Reserves an idle instance, or a creation slot while below capacity.
  fn try_admit(&self, state: &mut PoolState<T>) -> Option<Grant<T>> {
    if let Some(value) = state.idle.pop_front() {
      state.outstanding += 1;
      return Some(Grant::Instance(value));
    }

    if state.outstanding < self.capacity {
      state.outstanding += 1;
      return Some(Grant::Slot);
    }

    None
  }

  /// Admission step of an acquire, taken under the lock.
  fn admit(&self) -> Result<Admission<T>, PoolError<E>> {
    let mut state = self.state.lock();
    if state.closed {
      return Err(PoolError::PoolClosed);
    }

    // Late arrivals must queue behind earlier ones: while anyone waits there is neither an
    // idle instance nor a free slot to take.
    debug_assert!(
      state.waiters.is_empty() || (state.idle.is_empty() && state.outstanding == self.capacity),
      "waiters queued while capacity was available"
    );
    if let Some(grant) = self.try_admit(&mut state) {
      return Ok(Admission::Granted(grant));
    }

    let (waiter_id, rx) = state.waiters.enqueue();
    trace!(pool_name = %self.pool_name, waiter_id, waiting = state.waiters.len(), "Pool at capacity, acquire queued.");
    Ok(Admission::Queued(waiter_id, rx))
  }
}

enum Admission<T> {
  Granted(Grant<T>),
  Queued(u64, oneshot::Receiver<Grant<T>>),
}

/// An acquirer suspended in the waiter queue. Dropping it before the grant is observed
/// (timeout, cancellation, task abort) withdraws it from the line or re-releases its grant.
struct PendingWaiter<'a, T: Send + 'static, E: Send + 'static> {
  shared: &'a PoolShared<T, E>,
  waiter_id: u64,
  rx: oneshot::Receiver<Grant<T>>,
  observed: bool,
}

impl<'a, T: Send + 'static, E: Send + 'static> PendingWaiter<'a, T, E> {
  async fn wait(mut self) -> Result<Grant<T>, PoolError<E>> {
    let received = (&mut self.rx).await;
    self.observed = true;
    // The sender is only dropped without a grant when the pool is closed.
    received.map_err(|_| PoolError::PoolClosed)
  }
}

impl<'a, T: Send + 'static, E: Send + 'static> Drop for PendingWaiter<'a, T, E> {
  fn drop(&mut self) {
    if !self.observed {
      self.shared.abandon_wait(self.waiter_id, &mut self.rx);
    }
  }
}

/// A capacity slot reserved for a factory call. Given back unless the call succeeds.
struct SlotGuard<'a, T: Send + 'static, E: Send + 'static> {
  shared: &'a PoolShared<T, E>,
  armed: bool,
}

impl<'a, T: Send + 'static, E: Send + 'static> SlotGuard<'a, T, E> {
  fn disarm(mut self) {
    self.armed = false;
  }
}

impl<'a, T: Send + 'static, E: Send + 'static> Drop for SlotGuard<'a, T, E> {
  fn drop(&mut self) {
    if self.armed {
      self.shared.forfeit_slot();
    }
  }
}

/// A bounded pool of lazily created, reusable instances.
///
/// At most `capacity` instances are outstanding at any time. `acquire` reuses an idle
/// instance when one exists, creates a new one through the factory while below capacity,
/// and otherwise suspends until a release. Suspended acquirers are served in arrival order,
/// and a released instance goes straight to the oldest of them.
///
/// Cloning is cheap and yields another handle to the same pool.
pub struct BoundedPool<T: Send + 'static, E: Send + 'static> {
  shared: Arc<PoolShared<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> Clone for BoundedPool<T, E> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> fmt::Debug for BoundedPool<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BoundedPool")
      .field("pool_name", &self.shared.pool_name)
      .field("status", &self.status())
      .field("created_count", &self.created_count())
      .finish_non_exhaustive()
  }
}

impl<T: Send + 'static, E: Send + 'static> BoundedPool<T, E> {
  /// Creates a pool holding at most `capacity` outstanding instances built by `factory`.
  ///
  /// # Errors
  /// Returns `PoolError::InvalidCapacity` if `capacity` is zero.
  pub fn new<F, Fut>(capacity: usize, factory: F) -> Result<Self, PoolError<E>>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    Self::with_config(PoolConfig::new().capacity(capacity), factory)
  }

  /// Creates a pool from a full `PoolConfig`.
  ///
  /// # Errors
  /// Returns `PoolError::InvalidCapacity` if `config.capacity` is zero.
  pub fn with_config<F, Fut>(config: PoolConfig, factory: F) -> Result<Self, PoolError<E>>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    if config.capacity == 0 {
      warn!(pool_name = %config.name, "Rejecting pool configuration with zero capacity.");
      return Err(PoolError::InvalidCapacity(config.capacity));
    }

    info!(
      pool_name = %config.name,
      capacity = config.capacity,
      acquire_timeout = ?config.acquire_timeout,
      "Bounded pool created."
    );

    Ok(Self {
      shared: Arc::new(PoolShared {
        pool_name: Arc::new(config.name),
        capacity: config.capacity,
        acquire_timeout: config.acquire_timeout,
        state: Mutex::new(PoolState {
          outstanding: 0,
          idle: VecDeque::with_capacity(config.capacity),
          waiters: WaiterQueue::new(),
          closed: false,
        }),
        factory: boxed_factory(factory),
        created_count: AtomicU64::new(0),
      }),
    })
  }

  pub fn name(&self) -> &str {
    &self.shared.pool_name
  }

  pub fn capacity(&self) -> usize {
    self.shared.capacity
  }

  /// Total number of instances the factory has successfully produced for this pool.
  pub fn created_count(&self) -> u64 {
    self.shared.created_count.load(AtomicOrdering::Relaxed)
  }

  pub fn status(&self) -> PoolStatus {
    let state = self.shared.state.lock();
    PoolStatus {
      capacity: self.shared.capacity,
      outstanding: state.outstanding,
      idle: state.idle.len(),
      waiting: state.waiters.len(),
    }
  }

  pub fn is_closed(&self) -> bool {
    self.shared.state.lock().closed
  }

  /// Borrows an instance, waiting for one if the pool is at capacity.
  ///
  /// Applies the configured acquire timeout, if any.
  ///
  /// # Errors
  /// Returns `PoolError::Factory` if a new instance had to be created and the factory failed.
  /// Returns `PoolError::AcquireTimeout` if the configured timeout elapsed first.
  /// Returns `PoolError::PoolClosed` if the pool is or becomes closed.
  pub async fn acquire(&self) -> Result<PooledHandle<T, E>, PoolError<E>> {
    match self.shared.acquire_timeout {
      Some(timeout) => self.acquire_timeout(timeout).await,
      None => self.acquire_inner().await,
    }
  }

  /// Borrows an instance, giving up after `timeout`.
  ///
  /// A factory call still running at the deadline is abandoned and its slot given back.
  pub async fn acquire_timeout(&self, timeout: Duration) -> Result<PooledHandle<T, E>, PoolError<E>> {
    match tokio::time::timeout(timeout, self.acquire_inner()).await {
      Ok(result) => result,
      Err(_elapsed) => {
        debug!(pool_name = %self.shared.pool_name, ?timeout, "Acquire timed out.");
        Err(PoolError::AcquireTimeout(timeout))
      }
    }
  }

  /// Borrows an instance unless `cancellation_token` fires first.
  pub async fn acquire_with_cancel(
    &self,
    cancellation_token: &CancellationToken,
  ) -> Result<PooledHandle<T, E>, PoolError<E>> {
    tokio::select! {
      biased;
      _ = cancellation_token.cancelled() => {
        debug!(pool_name = %self.shared.pool_name, "Acquire cancelled by token.");
        Err(PoolError::AcquireCancelled)
      }
      result = self.acquire_inner() => result,
    }
  }

  /// Borrows an instance only if that needs no waiting: an idle instance is reused, or a new
  /// one is created while below capacity. Returns `Ok(None)` at capacity.
  pub async fn try_acquire(&self) -> Result<Option<PooledHandle<T, E>>, PoolError<E>> {
    let grant = {
      let mut state = self.shared.state.lock();
      if state.closed {
        return Err(PoolError::PoolClosed);
      }
      match self.shared.try_admit(&mut state) {
        Some(grant) => grant,
        None => return Ok(None),
      }
    };
    self.redeem(grant).await.map(Some)
  }

  /// Closes the pool and hands back its idle instances for teardown.
  ///
  /// Every suspended acquirer fails with `PoolError::PoolClosed`, as do later acquires.
  /// Instances still borrowed are dropped when their handles release them.
  pub fn close(&self) -> Vec<T> {
    let (idle, woken, outstanding) = {
      let mut state = self.shared.state.lock();
      if state.closed {
        return Vec::new();
      }
      state.closed = true;
      let idle: Vec<T> = state.idle.drain(..).collect();
      (idle, state.waiters.close_all(), state.outstanding)
    };
    info!(
      pool_name = %self.shared.pool_name,
      idle = idle.len(),
      woken_waiters = woken,
      outstanding,
      "Pool closed."
    );
    idle
  }

  async fn acquire_inner(&self) -> Result<PooledHandle<T, E>, PoolError<E>> {
    let grant = match self.shared.admit()? {
      Admission::Granted(grant) => grant,
      Admission::Queued(waiter_id, rx) => {
        let waiter = PendingWaiter {
          shared: &self.shared,
          waiter_id,
          rx,
          observed: false,
        };
        waiter.wait().await?
      }
    };
    self.redeem(grant).await
  }

  /// Turns a grant into a handle, running the factory for a bare slot.
  async fn redeem(&self, grant: Grant<T>) -> Result<PooledHandle<T, E>, PoolError<E>> {
    match grant {
      Grant::Instance(value) => {
        trace!(pool_name = %self.shared.pool_name, "Reusing idle instance.");
        Ok(PooledHandle::new(value, Arc::clone(&self.shared)))
      }
      Grant::Slot => self.create().await,
    }
  }

  async fn create(&self) -> Result<PooledHandle<T, E>, PoolError<E>> {
    let slot = SlotGuard {
      shared: &self.shared,
      armed: true,
    };
    debug!(pool_name = %self.shared.pool_name, "Creating new instance through factory.");

    match (self.shared.factory)().await {
      Ok(value) => {
        slot.disarm();
        let created = self.shared.created_count.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        debug!(pool_name = %self.shared.pool_name, created_count = created, "Factory produced new instance.");
        Ok(PooledHandle::new(value, Arc::clone(&self.shared)))
      }
      Err(error) => {
        // Dropping the armed guard passes the slot to the next waiter or frees it.
        drop(slot);
        warn!(pool_name = %self.shared.pool_name, "Factory failed, capacity slot given back.");
        Err(PoolError::Factory(error))
      }
    }
  }
}
