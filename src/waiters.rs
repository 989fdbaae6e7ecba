use std::collections::VecDeque;
use std::fmt;

use tokio::sync::oneshot;

/// What a woken waiter is handed.
#[derive(Debug, PartialEq)]
pub(crate) enum Grant<T> {
  /// A released instance, passed straight from the releasing handle.
  Instance(T),
  /// A creation slot freed by a failed factory call or a detached instance.
  /// The slot is already counted as outstanding; the receiver must run the factory.
  Slot,
}

/// FIFO line of acquirers suspended at capacity.
///
/// Every mutation happens under the pool's state lock, so a cancellation that removes an
/// entry is atomic with respect to a release that would grant to it.
pub(crate) struct WaiterQueue<T> {
  next_id: u64,
  entries: VecDeque<(u64, oneshot::Sender<Grant<T>>)>,
}

impl<T> fmt::Debug for WaiterQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WaiterQueue")
      .field("next_id", &self.next_id)
      .field("len", &self.entries.len())
      .finish()
  }
}

impl<T> WaiterQueue<T> {
  pub(crate) fn new() -> Self {
    Self {
      next_id: 0,
      entries: VecDeque::new(),
    }
  }

  /// Appends a new waiter to the back of the line.
  pub(crate) fn enqueue(&mut self) -> (u64, oneshot::Receiver<Grant<T>>) {
    let id = self.next_id;
    self.next_id += 1;
    let (tx, rx) = oneshot::channel();
    self.entries.push_back((id, tx));
    (id, rx)
  }

  /// Removes a waiter that gave up. Returns `false` if it was already served.
  pub(crate) fn remove(&mut self, id: u64) -> bool {
    match self.entries.iter().position(|(entry_id, _)| *entry_id == id) {
      Some(index) => {
        self.entries.remove(index);
        true
      }
      None => false,
    }
  }

  /// Hands `grant` to the oldest waiter still listening.
  ///
  /// Waiters whose receiver is gone are skipped and discarded. On success the id of the
  /// served waiter is returned; if nobody could take it the grant comes back as `Err`.
  pub(crate) fn grant(&mut self, mut grant: Grant<T>) -> Result<u64, Grant<T>> {
    while let Some((id, tx)) = self.entries.pop_front() {
      match tx.send(grant) {
        Ok(()) => return Ok(id),
        Err(returned) => {
          tracing::trace!(waiter_id = id, "Skipping waiter whose receiver was dropped.");
          grant = returned;
        }
      }
    }
    Err(grant)
  }

  /// Drops every pending sender, waking all waiters with a closed channel.
  pub(crate) fn close_all(&mut self) -> usize {
    let woken = self.entries.len();
    self.entries.clear();
    woken
  }

  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grants_in_arrival_order() {
    let mut queue = WaiterQueue::<u32>::new();
    let (id_a, mut rx_a) = queue.enqueue();
    let (id_b, mut rx_b) = queue.enqueue();
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.grant(Grant::Instance(7)), Ok(id_a));
    assert_eq!(rx_a.try_recv().unwrap(), Grant::Instance(7));
    assert!(rx_b.try_recv().is_err(), "second waiter must not be served yet");

    assert_eq!(queue.grant(Grant::Slot), Ok(id_b));
    assert_eq!(rx_b.try_recv().unwrap(), Grant::Slot);
    assert!(queue.is_empty());
  }

  #[test]
  fn test_grant_skips_dropped_receivers() {
    let mut queue = WaiterQueue::<u32>::new();
    let (_id_a, rx_a) = queue.enqueue();
    let (id_b, mut rx_b) = queue.enqueue();
    drop(rx_a);

    assert_eq!(queue.grant(Grant::Instance(1)), Ok(id_b));
    assert_eq!(rx_b.try_recv().unwrap(), Grant::Instance(1));
  }

  #[test]
  fn test_grant_returns_value_when_nobody_listens() {
    let mut queue = WaiterQueue::<u32>::new();
    assert_eq!(queue.grant(Grant::Instance(3)), Err(Grant::Instance(3)));

    let (_id, mut rx) = queue.enqueue();
    rx.close();
    assert_eq!(queue.grant(Grant::Instance(4)), Err(Grant::Instance(4)));
    assert!(queue.is_empty(), "closed waiter should have been discarded");
  }

  #[test]
  fn test_remove_only_pending_waiters() {
    let mut queue = WaiterQueue::<u32>::new();
    let (id_a, _rx_a) = queue.enqueue();
    let (id_b, _rx_b) = queue.enqueue();

    assert!(queue.remove(id_b));
    assert!(!queue.remove(id_b));
    assert_eq!(queue.grant(Grant::Slot), Ok(id_a));
    assert!(!queue.remove(id_a), "served waiter is no longer in line");
  }

  #[test]
  fn test_close_all_wakes_everyone() {
    let mut queue = WaiterQueue::<u32>::new();
    let (_a, mut rx_a) = queue.enqueue();
    let (_b, mut rx_b) = queue.enqueue();

    assert_eq!(queue.close_all(), 2);
    assert_eq!(rx_a.try_recv(), Err(oneshot::error::TryRecvError::Closed));
    assert_eq!(rx_b.try_recv(), Err(oneshot::error::TryRecvError::Closed));
  }
}
