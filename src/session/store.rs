// Single-slot snapshot store with a pass sequence guard

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::roster::RosterSnapshot;

/// Issued when a pass starts. Only the most recently issued ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTicket(u64);

impl PassTicket {
  pub fn sequence(&self) -> u64 {
    self.0
  }
}

#[derive(Default)]
pub struct SnapshotStore {
  slot: RwLock<Option<RosterSnapshot>>,
  sequence: AtomicU64,
}

impl SnapshotStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the current snapshot wholesale.
  pub fn set(&self, snapshot: RosterSnapshot) {
    let mut slot = match self.slot.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(snapshot);
  }

  pub fn current(&self) -> Option<RosterSnapshot> {
    match self.slot.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  /// Drop the snapshot. Returns whether one was present.
  pub fn clear(&self) -> bool {
    let mut slot = match self.slot.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    slot.take().is_some()
  }

  pub fn begin_pass(&self) -> PassTicket {
    PassTicket(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
  }

  pub fn is_latest(&self, ticket: PassTicket) -> bool {
    self.sequence.load(Ordering::SeqCst) == ticket.0
  }

  /// Store `snapshot` if `ticket` is still the latest pass. A stale pass is
  /// discarded and `false` is returned.
  pub fn commit(&self, ticket: PassTicket, snapshot: RosterSnapshot) -> bool {
    let mut slot = match self.slot.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    // Checked under the write lock so a newer commit cannot interleave
    if self.sequence.load(Ordering::SeqCst) != ticket.0 {
      return false;
    }
    *slot = Some(snapshot);
    true
  }

  /// Invalidate every pass currently in flight.
  pub fn invalidate_passes(&self) {
    self.sequence.fetch_add(1, Ordering::SeqCst);
  }
}
