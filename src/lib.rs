//! A Tokio-based bounded pool for expensive, lazily created resources such as remote
//! sessions, with FIFO waiting, cancellation-safe acquisition and scoped release.

mod config;
mod error;
mod factory;
mod handle;
mod naming;
mod pool;
mod waiters;

pub use config::{PoolConfig, DEFAULT_POOL_NAME};
pub use error::PoolError;
pub use factory::CreateFuture;
pub use handle::PooledHandle;
pub use naming::NameSequence;
pub use pool::{BoundedPool, PoolStatus};
