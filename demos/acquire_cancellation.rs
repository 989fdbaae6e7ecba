use bounded_pool::{BoundedPool, PoolError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Acquire Cancellation Example ---");

  let pool = BoundedPool::new(1, || async { Ok::<_, String>("only resource") }).expect("capacity is non-zero");

  let holder = pool.acquire().await.expect("first acquire succeeds");
  info!("Holding '{}'; the pool is now at capacity.", *holder);

  // Timeout-bounded acquire.
  match pool.acquire_timeout(Duration::from_millis(200)).await {
    Err(PoolError::AcquireTimeout(after)) => info!("Gave up waiting after {:?}.", after),
    other => info!("Unexpected outcome: {:?}", other.map(|h| *h)),
  }

  // Token-cancelled acquire.
  let token = CancellationToken::new();
  let waiting_pool = pool.clone();
  let waiter_token = token.clone();
  let waiter = tokio::spawn(async move {
    let outcome = waiting_pool.acquire_with_cancel(&waiter_token).await.map(|h| *h);
    outcome
  });

  tokio::time::sleep(Duration::from_millis(100)).await;
  info!("Waiting acquirers before cancel: {}", pool.status().waiting);
  token.cancel();
  info!("Cancelled acquire returned: {:?}", waiter.await.expect("waiter task joined"));
  info!("Waiting acquirers after cancel: {}", pool.status().waiting);

  drop(holder);
  info!("Status after release: {:?}", pool.status());
  info!("--- Acquire Cancellation Example End ---");
}
