use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Produces unique, numbered names for pooled resources, e.g. `"spark session 1"`,
/// `"spark session 2"`.
///
/// The counter belongs to the sequence, not to the process. Move or share a sequence into
/// the factory closure that needs distinct names for the instances it creates.
pub struct NameSequence {
  base: String,
  counter: AtomicU64,
}

impl NameSequence {
  pub fn new(base: impl Into<String>) -> Self {
    Self {
      base: base.into(),
      counter: AtomicU64::new(0),
    }
  }

  /// Returns the next name. Numbering starts at 1.
  pub fn next_name(&self) -> String {
    let n = self.counter.fetch_add(1, AtomicOrdering::Relaxed) + 1;
    format!("{} {}", self.base, n)
  }

  /// Number of names handed out so far.
  pub fn issued(&self) -> u64 {
    self.counter.load(AtomicOrdering::Relaxed)
  }

  pub fn base(&self) -> &str {
    &self.base
  }
}

impl fmt::Debug for NameSequence {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NameSequence")
      .field("base", &self.base)
      .field("issued", &self.issued())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;
  use std::sync::Arc;

  #[test]
  fn test_names_are_numbered_from_one() {
    let names = NameSequence::new("spark session");
    assert_eq!(names.next_name(), "spark session 1");
    assert_eq!(names.next_name(), "spark session 2");
    assert_eq!(names.issued(), 2);
    assert_eq!(names.base(), "spark session");
  }

  #[test]
  fn test_sequences_are_independent() {
    let a = NameSequence::new("a");
    let b = NameSequence::new("b");
    a.next_name();
    a.next_name();
    assert_eq!(b.next_name(), "b 1");
  }

  #[test]
  fn test_concurrent_names_are_unique() {
    let names = Arc::new(NameSequence::new("s"));
    let threads: Vec<_> = (0..4)
      .map(|_| {
        let names = names.clone();
        std::thread::spawn(move || (0..100).map(|_| names.next_name()).collect::<Vec<_>>())
      })
      .collect();

    let mut seen = HashSet::new();
    for thread in threads {
      for name in thread.join().unwrap() {
        assert!(seen.insert(name), "duplicate name issued");
      }
    }
    assert_eq!(seen.len(), 400);
  }
}
