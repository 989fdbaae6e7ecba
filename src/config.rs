use std::time::Duration;

/// Name given to pools built without an explicit one.
pub const DEFAULT_POOL_NAME: &str = "bounded_pool";

/// Configuration for a `BoundedPool`.
///
/// Use the builder methods or [`Default::default()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
  /// Maximum number of instances that may be borrowed at the same time.
  pub capacity: usize,

  /// Name used in log records emitted by the pool and its handles.
  pub name: String,

  /// Deadline applied by `BoundedPool::acquire`. `None` waits indefinitely.
  pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      capacity: 1,
      name: DEFAULT_POOL_NAME.to_string(),
      acquire_timeout: None,
    }
  }
}

impl PoolConfig {
  /// Create a new pool configuration with default values.
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the maximum number of outstanding instances.
  pub fn capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  /// Set the pool name.
  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Set the default acquire timeout.
  pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
    self.acquire_timeout = Some(timeout);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = PoolConfig::default();
    assert_eq!(config.capacity, 1);
    assert_eq!(config.name, DEFAULT_POOL_NAME);
    assert_eq!(config.acquire_timeout, None);
  }

  #[test]
  fn test_builder_overrides() {
    let config = PoolConfig::new()
      .capacity(4)
      .name("livy_sessions")
      .acquire_timeout(Duration::from_secs(5));
    assert_eq!(config.capacity, 4);
    assert_eq!(config.name, "livy_sessions");
    assert_eq!(config.acquire_timeout, Some(Duration::from_secs(5)));
  }
}
