use bounded_pool::{BoundedPool, PoolError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
struct Connection {
  id: u32,
}

#[tokio::main]
async fn main() -> Result<(), PoolError<String>> {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Basic Usage Example ---");

  let next_id = Arc::new(AtomicU32::new(1));
  let pool = BoundedPool::new(2, move || {
    let id = next_id.fetch_add(1, Ordering::SeqCst);
    async move {
      // Stand-in for an expensive handshake.
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(Connection { id })
    }
  })?;

  {
    let conn = pool.acquire().await?;
    info!("Borrowed connection {} from '{}'.", conn.id, conn.pool_name());
  } // Returned to the pool here.

  let conn = pool.acquire().await?;
  info!("Borrowed connection {} again without creating a new one.", conn.id);
  conn.release();

  info!("Pool status: {:?}, created: {}", pool.status(), pool.created_count());
  for idle in pool.close() {
    info!("Tearing down idle connection {}.", idle.id);
  }
  info!("--- Basic Usage Example End ---");
  Ok(())
}
