use bounded_pool::{BoundedPool, NameSequence, PoolConfig, PooledHandle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A stand-in for a remote Spark session that takes a while to start.
#[derive(Debug)]
struct RemoteSession {
  name: String,
  statements_run: u32,
}

impl RemoteSession {
  async fn start(name: String) -> Result<Self, String> {
    info!("Starting remote session '{}'.", name);
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok(Self {
      name,
      statements_run: 0,
    })
  }

  async fn execute(&mut self, query: &str) -> String {
    tokio::time::sleep(Duration::from_millis(200)).await;
    self.statements_run += 1;
    format!("[{}] ran '{}'", self.name, query)
  }
}

async fn run_query(pool: BoundedPool<RemoteSession, String>, query: String) -> Result<String, String> {
  let mut session: PooledHandle<RemoteSession, String> = pool.acquire().await.map_err(|e| e.to_string())?;
  Ok(session.execute(&query).await)
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();

  info!("--- Session Pool Example (at most 2 live sessions) ---");

  let names = Arc::new(NameSequence::new("spark session"));
  let factory_names = names.clone();
  let config = PoolConfig::new()
    .capacity(2)
    .name("livy_sessions")
    .acquire_timeout(Duration::from_secs(10));
  let pool = BoundedPool::with_config(config, move || RemoteSession::start(factory_names.next_name()))
    .expect("capacity is non-zero");

  let started = Instant::now();
  let mut handles = Vec::new();
  for i in 0..6 {
    let query = format!("SELECT COUNT(*) FROM cosmos WHERE shard = {}", i);
    handles.push(tokio::spawn(run_query(pool.clone(), query)));
  }

  for handle in handles {
    match handle.await {
      Ok(Ok(line)) => info!("{}", line),
      Ok(Err(e)) => warn!("Query failed: {}", e),
      Err(join_error) => warn!("Query task failed: {:?}", join_error),
    }
  }

  info!(
    "Ran 6 queries in {:?} using {} sessions ({} names issued).",
    started.elapsed(),
    pool.created_count(),
    names.issued()
  );
  for session in pool.close() {
    info!("Closing '{}' after {} statements.", session.name, session.statements_run);
  }
  info!("--- Session Pool Example End ---");
}
