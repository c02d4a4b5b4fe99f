// Snapshot observers

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};
use uuid::Uuid;

use crate::roster::RosterSnapshot;

/// Receives a private copy of every published snapshot. `None` means the
/// session lost its snapshot (disconnect or terminal loss).
pub type SnapshotCallback = Arc<dyn Fn(Option<RosterSnapshot>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

#[derive(Default)]
pub struct ListenerRegistry {
  listeners: Mutex<Vec<(ListenerId, SnapshotCallback)>>,
}

impl ListenerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe(&self, callback: SnapshotCallback) -> ListenerId {
    let id = ListenerId(Uuid::new_v4());
    let mut listeners = match self.listeners.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    listeners.push((id, callback));
    id
  }

  pub fn unsubscribe(&self, id: ListenerId) -> bool {
    let mut listeners = match self.listeners.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    let before = listeners.len();
    listeners.retain(|(listener_id, _)| *listener_id != id);
    listeners.len() != before
  }

  pub fn len(&self) -> usize {
    match self.listeners.lock() {
      Ok(guard) => guard.len(),
      Err(poisoned) => poisoned.into_inner().len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Deliver to every listener in registration order. A panicking callback
  /// is logged and skipped; the rest still run.
  pub fn publish(&self, snapshot: Option<&RosterSnapshot>) {
    // Snapshot the list so callbacks may (un)subscribe without deadlocking
    let listeners: Vec<(ListenerId, SnapshotCallback)> = match self.listeners.lock() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    };
    debug!(
      target: "lcu::listeners",
      "[LCU Listeners] Publishing to {} listener(s)",
      listeners.len()
    );

    for (id, callback) in listeners {
      let copy = snapshot.cloned();
      if catch_unwind(AssertUnwindSafe(|| callback(copy))).is_err() {
        error!(
          target: "lcu::listeners",
          "[LCU Listeners] Listener {:?} panicked; continuing with the rest",
          id
        );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lcu::GamePhase;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn counting(counter: Arc<AtomicUsize>) -> SnapshotCallback {
    Arc::new(move |_: Option<RosterSnapshot>| {
      counter.fetch_add(1, Ordering::SeqCst);
    })
  }

  /// Test: a failing listener does not starve its neighbours
  ///
  /// Scenario: Three listeners, the second panics.
  /// Expected: The first and third each receive the snapshot exactly once.
  #[test]
  fn test_failing_listener_is_isolated() {
    let registry = ListenerRegistry::new();
    let first = Arc::new(AtomicUsize::new(0));
    let third = Arc::new(AtomicUsize::new(0));

    registry.subscribe(counting(first.clone()));
    registry.subscribe(Arc::new(|_: Option<RosterSnapshot>| panic!("listener failure")));
    registry.subscribe(counting(third.clone()));

    registry.publish(Some(&RosterSnapshot::empty(GamePhase::ChampSelect)));

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(third.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_delivery_follows_registration_order() {
    let registry = ListenerRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["a", "b", "c"] {
      let order = order.clone();
      registry.subscribe(Arc::new(move |_: Option<RosterSnapshot>| {
        order.lock().unwrap().push(tag)
      }));
    }

    registry.publish(None);
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
  }

  #[test]
  fn test_unsubscribed_listener_stops_receiving() {
    let registry = ListenerRegistry::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let id = registry.subscribe(counting(hits.clone()));

    registry.publish(None);
    assert!(registry.unsubscribe(id));
    assert!(!registry.unsubscribe(id));
    registry.publish(None);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
  }

  #[test]
  fn test_each_listener_gets_its_own_copy() {
    let registry = ListenerRegistry::new();
    let seen: Arc<Mutex<Vec<Option<RosterSnapshot>>>> = Arc::new(Mutex::new(Vec::new()));

    registry.subscribe(Arc::new(|snapshot: Option<RosterSnapshot>| {
      if let Some(mut snapshot) = snapshot {
        snapshot.phase = GamePhase::Unknown;
        assert_eq!(snapshot.phase, GamePhase::Unknown);
      }
    }));
    let sink = seen.clone();
    registry.subscribe(Arc::new(move |snapshot: Option<RosterSnapshot>| {
      sink.lock().unwrap().push(snapshot)
    }));

    let original = RosterSnapshot::empty(GamePhase::ChampSelect);
    registry.publish(Some(&original));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].as_ref().map(|s| s.phase), Some(GamePhase::ChampSelect));
    assert_eq!(original.phase, GamePhase::ChampSelect);
  }
}
