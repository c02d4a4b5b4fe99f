// Session lifecycle: connect, event loop with bounded reconnection, disconnect

use http::Method;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::listeners::{ListenerId, ListenerRegistry, SnapshotCallback};
use super::phase::PhaseMachine;
use super::store::SnapshotStore;
use crate::config::MonitorConfig;
use crate::error::LcuError;
use crate::lcu::types::CURRENT_SUMMONER_PATH;
use crate::lcu::{
  ConnectionCredentials, ConnectionState, CredentialResolver, EventSource, EventStream, LcuApi,
  RequestGateway,
};
use crate::roster::RosterSnapshot;

/// One monitoring session against the local client. Cheap to clone; all
/// clones share the same connection, snapshot and listeners.
#[derive(Clone)]
pub struct LcuSession {
  inner: Arc<SessionInner>,
}

struct SessionInner {
  config: MonitorConfig,
  resolver: Arc<dyn CredentialResolver>,
  gateway: Arc<dyn RequestGateway>,
  events: Arc<dyn EventSource>,
  state: RwLock<ConnectionState>,
  api: RwLock<Option<LcuApi>>,
  machine: PhaseMachine,
  // Bumped on every connect/disconnect; background work from an older
  // connection must not touch shared state.
  generation: AtomicU64,
  // Serializes connect and disconnect
  active: AsyncMutex<Option<CancellationToken>>,
}

impl LcuSession {
  pub fn new(
    config: MonitorConfig,
    resolver: Arc<dyn CredentialResolver>,
    gateway: Arc<dyn RequestGateway>,
    events: Arc<dyn EventSource>,
  ) -> Self {
    let store = Arc::new(SnapshotStore::new());
    let listeners = Arc::new(ListenerRegistry::new());
    Self {
      inner: Arc::new(SessionInner {
        config,
        resolver,
        gateway,
        events,
        state: RwLock::new(ConnectionState::disconnected()),
        api: RwLock::new(None),
        machine: PhaseMachine::new(store, listeners),
        generation: AtomicU64::new(0),
        active: AsyncMutex::new(None),
      }),
    }
  }

  /// Resolve credentials, verify them with one probe, open the event
  /// subscription and reconcile the current phase. No retries here.
  /// A `disconnect()` issued meanwhile abandons the attempt.
  pub async fn connect(&self) -> Result<ConnectionState, LcuError> {
    let inner = &self.inner;
    let (generation, cancel) = {
      let mut active = inner.active.lock().await;
      if let Some(previous) = active.take() {
        info!(target: "lcu::session", "[LCU Session] Replacing existing connection");
        inner.shutdown(previous);
      }
      let cancel = CancellationToken::new();
      *active = Some(cancel.clone());
      (inner.generation.fetch_add(1, Ordering::SeqCst) + 1, cancel)
    };

    let handshake = tokio::select! {
      _ = cancel.cancelled() => None,
      result = inner.handshake() => Some(result),
    };
    let (credentials, stream) = match handshake {
      Some(Ok(opened)) => opened,
      Some(Err(e)) => return Err(inner.fail(generation, e)),
      None => return Err(abandoned()),
    };

    let api = LcuApi::new(inner.gateway.clone(), credentials.clone());
    let ticket = {
      let _active = inner.active.lock().await;
      if cancel.is_cancelled() {
        return Err(abandoned());
      }
      let state = ConnectionState::connected(&credentials);
      inner.set_state(state.clone());
      inner.set_api(Some(api.clone()));
      info!(
        target: "lcu::session",
        "[LCU Session] Connected on port {} (credential present: {})",
        credentials.port,
        state.has_credential
      );

      tokio::spawn(run_event_loop(
        inner.clone(),
        credentials,
        api.clone(),
        stream,
        cancel.clone(),
        generation,
      ));
      // Taken under the lock so a later disconnect() invalidates it
      inner.machine.store().begin_pass()
    };

    inner.machine.reconcile_with(&api, ticket).await;
    Ok(inner.state())
  }

  /// Tear everything down. Safe to call repeatedly.
  pub async fn disconnect(&self) {
    let mut active = self.inner.active.lock().await;
    let previous = active.take();
    self.inner.generation.fetch_add(1, Ordering::SeqCst);
    if let Some(cancel) = previous {
      info!(target: "lcu::session", "[LCU Session] Disconnecting");
      self.inner.shutdown(cancel);
    } else {
      self.inner.clear_connection(false);
    }
  }

  /// Re-run reconciliation for the current phase.
  pub async fn refresh(&self) -> Result<Option<RosterSnapshot>, LcuError> {
    let api = self.inner.api().ok_or(LcuError::NotConnected)?;
    Ok(self.inner.machine.reconcile(&api).await)
  }

  pub fn connection_state(&self) -> ConnectionState {
    self.inner.state()
  }

  pub fn current_snapshot(&self) -> Option<RosterSnapshot> {
    self.inner.machine.store().current()
  }

  pub fn subscribe<F>(&self, callback: F) -> ListenerId
  where
    F: Fn(Option<RosterSnapshot>) + Send + Sync + 'static,
  {
    let callback: SnapshotCallback = Arc::new(callback);
    self.inner.machine.listeners().subscribe(callback)
  }

  pub fn unsubscribe(&self, id: ListenerId) -> bool {
    self.inner.machine.listeners().unsubscribe(id)
  }
}

impl SessionInner {
  fn state(&self) -> ConnectionState {
    match self.state.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  fn set_state(&self, state: ConnectionState) {
    match self.state.write() {
      Ok(mut guard) => *guard = state,
      Err(poisoned) => *poisoned.into_inner() = state,
    }
  }

  /// Apply `update` only while `generation` is still the live connection.
  fn update_state_if_current<F>(&self, generation: u64, update: F) -> bool
  where
    F: FnOnce(&ConnectionState) -> ConnectionState,
  {
    let mut guard = match self.state.write() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if self.generation.load(Ordering::SeqCst) != generation {
      return false;
    }
    *guard = update(&guard);
    true
  }

  fn api(&self) -> Option<LcuApi> {
    match self.api.read() {
      Ok(guard) => guard.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  fn set_api(&self, api: Option<LcuApi>) {
    match self.api.write() {
      Ok(mut guard) => *guard = api,
      Err(poisoned) => *poisoned.into_inner() = api,
    }
  }

  /// Resolve, check the credential and subscribe.
  async fn handshake(&self) -> Result<(Arc<ConnectionCredentials>, EventStream), LcuError> {
    let credentials = Arc::new(self.resolver.resolve().await?);
    debug!(
      target: "lcu::session",
      "[LCU Session] Using {} (token {})",
      credentials.base_url,
      credentials.redacted_token()
    );

    let check = self
      .gateway
      .request(&credentials, Method::GET, CURRENT_SUMMONER_PATH)
      .await?;
    if !check.is_success() {
      return Err(LcuError::AuthFailed {
        status: check.status,
      });
    }

    let stream = self.events.open(&credentials).await?;
    Ok((credentials, stream))
  }

  fn fail(&self, generation: u64, error: LcuError) -> LcuError {
    warn!(target: "lcu::session", "[LCU Session] Connect failed: {}", error);
    self.update_state_if_current(generation, |_| ConnectionState::failed(&error));
    error
  }

  fn shutdown(&self, cancel: CancellationToken) {
    cancel.cancel();
    self.clear_connection(false);
  }

  fn clear_connection(&self, always_notify: bool) {
    self.set_api(None);
    self.set_state(ConnectionState::disconnected());
    self.machine.reset(always_notify);
  }

  /// Reconnection bound exhausted.
  fn terminal_loss(&self, generation: u64, error: &LcuError) {
    let applied = self.update_state_if_current(generation, |_| ConnectionState::failed(error));
    if !applied {
      return;
    }
    error!(
      target: "lcu::session",
      "[LCU Session] Giving up after {} reconnection attempts: {}",
      self.config.max_reconnect_attempts,
      error
    );
    self.set_api(None);
    self.machine.reset(true);
  }
}

fn abandoned() -> LcuError {
  debug!(target: "lcu::session", "[LCU Session] Connect abandoned by disconnect");
  LcuError::NotConnected
}

async fn run_event_loop(
  inner: Arc<SessionInner>,
  credentials: Arc<ConnectionCredentials>,
  api: LcuApi,
  mut stream: EventStream,
  cancel: CancellationToken,
  generation: u64,
) {
  loop {
    loop {
      tokio::select! {
        _ = cancel.cancelled() => return,
        next = stream.recv() => match next {
          Some(event) => {
            tokio::select! {
              _ = cancel.cancelled() => return,
              _ = inner.machine.handle_event(&api, event) => {}
            }
          }
          None => break,
        }
      }
    }

    warn!(target: "lcu::session", "[LCU Session] Event stream closed unexpectedly");
    let closed = LcuError::Unreachable("event stream closed".into());
    inner.update_state_if_current(generation, |s| s.with_error(&closed));

    let mut last_error = closed;
    let mut reopened = None;
    for attempt in 1..=inner.config.max_reconnect_attempts {
      let delay = inner.config.reconnect_delay(attempt);
      info!(
        target: "lcu::session",
        "[LCU Session] Reconnecting in {:?} (attempt {}/{})",
        delay,
        attempt,
        inner.config.max_reconnect_attempts
      );
      tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(delay) => {}
      }

      let result = tokio::select! {
        _ = cancel.cancelled() => return,
        result = inner.events.open(&credentials) => result,
      };
      match result {
        Ok(next) => {
          reopened = Some(next);
          break;
        }
        Err(e) => {
          warn!(
            target: "lcu::session",
            "[LCU Session] Reconnection attempt {} failed: {}",
            attempt,
            e
          );
          inner.update_state_if_current(generation, |s| s.with_error(&e));
          last_error = e;
        }
      }
    }

    match reopened {
      Some(next) => {
        stream = next;
        info!(target: "lcu::session", "[LCU Session] Event stream re-opened");
        inner.update_state_if_current(generation, |_| ConnectionState::connected(&credentials));
        // Catch up on whatever changed while the stream was down
        tokio::select! {
          _ = cancel.cancelled() => return,
          _ = inner.machine.reconcile(&api) => {}
        }
      }
      None => {
        inner.terminal_loss(generation, &last_error);
        return;
      }
    }
  }
}
