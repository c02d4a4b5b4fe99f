// Tests for connect/disconnect/refresh

use super::test_helpers::*;

#[cfg(test)]
mod connection_tests {
  use super::*;
  use crate::error::{ErrorKind, LcuError};
  use crate::lcu::types::{CURRENT_SUMMONER_PATH, GAMEFLOW_PHASE_PATH, GAMEFLOW_SESSION_PATH};
  use crate::lcu::{GamePhase, LockfileResolver};
  use crate::session::LcuSession;
  use std::sync::Arc;
  use std::time::Duration;

  /// Test: no discoverable client
  ///
  /// Scenario: The lockfile directory does not exist.
  /// Expected: NotFound, lastError set, nothing opened.
  #[tokio::test]
  async fn test_connect_without_client_is_not_found() {
    let gateway = Arc::new(MockGateway::new());
    let events = Arc::new(FakeEventSource::new());
    let missing = std::env::temp_dir().join(format!("lcu-monitor-none-{}", uuid::Uuid::new_v4()));
    let session = LcuSession::new(
      test_config(),
      Arc::new(LockfileResolver::new(vec![missing])),
      gateway.clone(),
      events.clone(),
    );

    let err = session.connect().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Discovery);
    let state = session.connection_state();
    assert!(!state.is_connected);
    assert!(state.last_error.is_some());
    assert_eq!(gateway.total_calls(), 0);
    assert_eq!(events.opens(), 0);
  }

  /// Test: probe rejected
  #[tokio::test]
  async fn test_connect_with_rejected_probe_is_auth_failure() {
    let gateway = Arc::new(MockGateway::new());
    gateway.respond_status(CURRENT_SUMMONER_PATH, 401, "");
    let events = Arc::new(FakeEventSource::new());
    let session = build_session(gateway, events.clone());

    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, LcuError::AuthFailed { status: 401 }));
    assert!(!session.connection_state().is_connected);
    assert_eq!(events.opens(), 0);
  }

  /// Test: transport failure during the probe
  #[tokio::test]
  async fn test_connect_with_transport_failure_is_unreachable() {
    let gateway = Arc::new(MockGateway::new());
    gateway.fail(CURRENT_SUMMONER_PATH, "connection refused");
    let session = build_session(gateway, Arc::new(FakeEventSource::new()));

    let err = session.connect().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    let state = session.connection_state();
    assert!(state.last_error.unwrap().contains("connection refused"));
  }

  /// Test: connect reconciles champ select immediately
  ///
  /// Scenario: Two 1-player rosters; the ally has spell1Id=4 and no spell2Id.
  /// Expected: Flash / Unselected, published once to the listener.
  #[tokio::test]
  async fn test_connect_publishes_initial_champ_select_snapshot() {
    let gateway = gateway_in_champ_select();
    let events = Arc::new(FakeEventSource::new());
    let _feed = events.push_stream();
    let session = build_session(gateway.clone(), events.clone());
    let seen = recording_listener(&session);

    let state = session.connect().await.unwrap();

    assert!(state.is_connected);
    assert!(state.has_credential);
    assert_eq!(state.port, Some(TEST_PORT));
    assert_eq!(events.opens(), 1);

    let snapshot = session.current_snapshot().unwrap();
    assert_eq!(snapshot.phase, GamePhase::ChampSelect);
    assert_eq!(snapshot.my_team.len(), 1);
    assert_eq!(snapshot.their_team.len(), 1);

    let ally = &snapshot.my_team[0];
    assert_eq!(ally.display_name, "Local#TEST");
    assert_eq!(ally.champion_name, "Ahri");
    assert_eq!(ally.spell1_name, "Flash");
    assert_eq!(ally.spell2_name, "Unselected");
    assert_eq!(snapshot.their_team[0].spell1_name, "Smite");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].as_ref(), Some(&snapshot));
    // The inline spell short-circuits every lookup stage
    assert_eq!(gateway.calls_to("/lol-summoner/v1/summoners/1001"), 0);
  }

  /// Test: disconnect is idempotent
  ///
  /// Scenario: Connect, then disconnect twice.
  /// Expected: Same end state both times, a single `None` publication.
  #[tokio::test]
  async fn test_disconnect_twice_is_idempotent() {
    let events = Arc::new(FakeEventSource::new());
    let _feed = events.push_stream();
    let session = build_session(gateway_in_champ_select(), events.clone());
    session.connect().await.unwrap();
    let seen = recording_listener(&session);

    session.disconnect().await;
    let after_first = session.connection_state();
    session.disconnect().await;
    let after_second = session.connection_state();

    assert_eq!(after_first, after_second);
    assert!(!after_second.is_connected);
    assert!(session.current_snapshot().is_none());
    assert_eq!(*seen.lock().unwrap(), vec![None]);
    assert_eq!(events.opens(), 1);
  }

  #[tokio::test]
  async fn test_disconnect_before_connect_is_noop() {
    let session = build_session(Arc::new(MockGateway::new()), Arc::new(FakeEventSource::new()));
    let seen = recording_listener(&session);

    session.disconnect().await;

    assert_eq!(session.connection_state(), crate::lcu::ConnectionState::disconnected());
    assert!(seen.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_refresh_requires_connection() {
    let session = build_session(Arc::new(MockGateway::new()), Arc::new(FakeEventSource::new()));
    assert!(matches!(session.refresh().await, Err(LcuError::NotConnected)));
  }

  /// Test: refresh re-runs reconciliation and replaces the snapshot
  #[tokio::test]
  async fn test_refresh_replaces_snapshot() {
    let gateway = gateway_in_champ_select();
    let events = Arc::new(FakeEventSource::new());
    let _feed = events.push_stream();
    let session = build_session(gateway.clone(), events);
    session.connect().await.unwrap();

    gateway.respond_json(GAMEFLOW_SESSION_PATH, serde_json::json!({"phase": "None"}));
    let refreshed = session.refresh().await.unwrap().unwrap();

    assert_eq!(refreshed.phase, GamePhase::None);
    assert!(refreshed.is_empty());
    assert_eq!(session.current_snapshot().unwrap().phase, GamePhase::None);
  }

  /// Test: phase falls back to the bare phase endpoint
  #[tokio::test]
  async fn test_reconcile_falls_back_to_phase_endpoint() {
    let gateway = gateway_in_phase("ChampSelect");
    gateway.respond_status(GAMEFLOW_SESSION_PATH, 500, "");
    gateway.respond_json(GAMEFLOW_PHASE_PATH, serde_json::json!("Lobby"));
    let events = Arc::new(FakeEventSource::new());
    let _feed = events.push_stream();
    let session = build_session(gateway.clone(), events);

    session.connect().await.unwrap();

    let snapshot = session.current_snapshot().unwrap();
    assert_eq!(snapshot.phase, GamePhase::Lobby);
    assert!(snapshot.is_empty());
    assert_eq!(gateway.calls_to(GAMEFLOW_PHASE_PATH), 1);
  }

  /// Test: phase unreadable everywhere
  #[tokio::test]
  async fn test_reconcile_without_phase_publishes_unknown() {
    let gateway = gateway_in_phase("ChampSelect");
    gateway.fail(GAMEFLOW_SESSION_PATH, "reset");
    gateway.fail(GAMEFLOW_PHASE_PATH, "reset");
    let events = Arc::new(FakeEventSource::new());
    let _feed = events.push_stream();
    let session = build_session(gateway, events);

    let state = session.connect().await.unwrap();

    assert!(state.is_connected);
    let snapshot = session.current_snapshot().unwrap();
    assert_eq!(snapshot.phase, GamePhase::Unknown);
    assert!(snapshot.is_empty());
  }

  /// Test: a second connect replaces the first connection
  #[tokio::test]
  async fn test_connect_while_connected_replaces_session() {
    let events = Arc::new(FakeEventSource::new());
    let _first = events.push_stream();
    let _second = events.push_stream();
    let session = build_session(gateway_in_champ_select(), events.clone());

    session.connect().await.unwrap();
    let state = session.connect().await.unwrap();

    assert!(state.is_connected);
    assert_eq!(events.opens(), 2);
    assert_eq!(session.current_snapshot().unwrap().phase, GamePhase::ChampSelect);
  }

  /// Test: disconnect does not wait for a stalled connect
  ///
  /// Scenario: The current-summoner check hangs for 5 s and disconnect() is called meanwhile.
  /// Expected: disconnect returns at once, connect gives up with NotConnected
  /// and no event stream is opened.
  #[tokio::test(start_paused = true)]
  async fn test_disconnect_abandons_pending_connect() {
    let gateway = gateway_in_champ_select();
    gateway.delay(CURRENT_SUMMONER_PATH, Duration::from_secs(5));
    let events = Arc::new(FakeEventSource::new());
    let _feed = events.push_stream();
    let session = build_session(gateway, events.clone());
    let pending = tokio::spawn({
      let session = session.clone();
      async move { session.connect().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = tokio::time::Instant::now();
    session.disconnect().await;
    assert!(started.elapsed() < Duration::from_secs(1));

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
    assert!(!session.connection_state().is_connected);
    assert!(session.current_snapshot().is_none());
    assert_eq!(events.opens(), 0);
  }
}
