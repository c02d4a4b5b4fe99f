// Phase state machine: turns gameflow/champ-select events into snapshots

use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace, warn};

use super::listeners::ListenerRegistry;
use super::store::{PassTicket, SnapshotStore};
use crate::error::LcuError;
use crate::lcu::types::{
  game_details_path, CHAMP_SELECT_SESSION_PATH, GAMEFLOW_PHASE_PATH, GAMEFLOW_SESSION_PATH,
};
use crate::lcu::{EventTopic, GamePhase, LcuApi, LcuEvent};
use crate::roster::{Enricher, PassContext, RosterSnapshot};

/// Team id assumed for the local player when nothing else identifies it.
const DEFAULT_TEAM_ID: i64 = 100;

pub struct PhaseMachine {
  store: Arc<SnapshotStore>,
  listeners: Arc<ListenerRegistry>,
  last_phase: Mutex<GamePhase>,
  // Keeps commit and publish together so observers see commit order
  publish_lock: Mutex<()>,
}

impl PhaseMachine {
  pub fn new(store: Arc<SnapshotStore>, listeners: Arc<ListenerRegistry>) -> Self {
    Self {
      store,
      listeners,
      last_phase: Mutex::new(GamePhase::None),
      publish_lock: Mutex::new(()),
    }
  }

  pub fn store(&self) -> &SnapshotStore {
    &self.store
  }

  pub fn listeners(&self) -> &ListenerRegistry {
    &self.listeners
  }

  /// React to one pushed event. Returns the snapshot this event committed, if any.
  pub async fn handle_event(&self, api: &LcuApi, event: LcuEvent) -> Option<RosterSnapshot> {
    if !event.topic.drives_state() {
      trace!(target: "lcu::phase", "[LCU Phase] Ignoring event on {}", event.uri);
      return None;
    }
    let removed = event.is_delete() || event.payload.is_null();

    // Only branches that commit take a ticket; taking one supersedes in-flight passes
    match event.topic {
      EventTopic::GameflowPhase => {
        let ticket = self.store.begin_pass();
        let phase = if removed {
          GamePhase::None
        } else {
          event.payload.as_str().map(GamePhase::parse).unwrap_or(GamePhase::Unknown)
        };
        self.note_phase(phase);
        let snapshot = self.build_snapshot(api, phase, None).await;
        self.commit_and_publish(ticket, snapshot)
      }
      EventTopic::GameflowSession => {
        let ticket = self.store.begin_pass();
        let phase = if removed {
          GamePhase::None
        } else {
          event
            .payload
            .get("phase")
            .and_then(|v| v.as_str())
            .map(GamePhase::parse)
            .unwrap_or(GamePhase::Unknown)
        };
        self.note_phase(phase);
        // The gameflow session doubles as the in-game seed
        let seed = (phase == GamePhase::InProgress).then_some(event.payload);
        let snapshot = self.build_snapshot(api, phase, seed).await;
        self.commit_and_publish(ticket, snapshot)
      }
      EventTopic::ChampSelectSession => {
        if removed {
          debug!(target: "lcu::phase", "[LCU Phase] Champ select session removed");
          return None;
        }
        let ticket = self.store.begin_pass();
        self.note_phase(GamePhase::ChampSelect);
        let snapshot = self
          .build_snapshot(api, GamePhase::ChampSelect, Some(event.payload))
          .await;
        self.commit_and_publish(ticket, snapshot)
      }
      _ => None,
    }
  }

  /// Query the current phase and run its routine. Never fails: if the phase
  /// cannot be read an empty snapshot tagged `Unknown` is published.
  pub async fn reconcile(&self, api: &LcuApi) -> Option<RosterSnapshot> {
    let ticket = self.store.begin_pass();
    self.reconcile_with(api, ticket).await
  }

  /// `reconcile` for a ticket the caller already holds.
  pub async fn reconcile_with(&self, api: &LcuApi, ticket: PassTicket) -> Option<RosterSnapshot> {
    let (phase, seed) = match current_phase(api).await {
      Ok(found) => found,
      Err(e) => {
        warn!(target: "lcu::phase", "[LCU Phase] Could not read current phase: {}", e);
        return self.commit_and_publish(ticket, RosterSnapshot::empty(GamePhase::Unknown));
      }
    };
    info!(target: "lcu::phase", "[LCU Phase] Reconciling in phase {}", phase);
    self.note_phase(phase);

    let seed = seed.filter(|_| phase == GamePhase::InProgress);
    let snapshot = self.build_snapshot(api, phase, seed).await;
    self.commit_and_publish(ticket, snapshot)
  }

  /// Run the routine for `phase`. Failures collapse into an empty snapshot
  /// tagged with the same phase.
  async fn build_snapshot(&self, api: &LcuApi, phase: GamePhase, seed: Option<Value>) -> RosterSnapshot {
    let ctx = PassContext::new(api.clone());
    let result = match phase {
      GamePhase::None => Ok(RosterSnapshot::empty(GamePhase::None)),
      GamePhase::InProgress => in_game_snapshot(&ctx, seed).await,
      other => champ_select_snapshot(&ctx, other, seed).await,
    };

    result.unwrap_or_else(|e| {
      warn!(
        target: "lcu::phase",
        "[LCU Phase] {} pass failed, publishing empty rosters: {}",
        phase,
        e
      );
      RosterSnapshot::empty(phase)
    })
  }

  fn commit_and_publish(&self, ticket: PassTicket, snapshot: RosterSnapshot) -> Option<RosterSnapshot> {
    let _guard = match self.publish_lock.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if !self.store.commit(ticket, snapshot.clone()) {
      debug!(
        target: "lcu::phase",
        "[LCU Phase] Pass {} superseded, discarding {} snapshot",
        ticket.sequence(),
        snapshot.phase
      );
      return None;
    }
    info!(
      target: "lcu::phase",
      "[LCU Phase] Snapshot {}: {} ally / {} enemy",
      snapshot.phase,
      snapshot.my_team.len(),
      snapshot.their_team.len()
    );
    self.listeners.publish(Some(&snapshot));
    Some(snapshot)
  }

  /// Drop the snapshot and cancel in-flight passes. Observers get `None`
  /// when `always_notify` is set or a snapshot was actually dropped.
  pub fn reset(&self, always_notify: bool) {
    let _guard = match self.publish_lock.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    self.store.invalidate_passes();
    let had_snapshot = self.store.clear();
    match self.last_phase.lock() {
      Ok(mut guard) => *guard = GamePhase::None,
      Err(poisoned) => *poisoned.into_inner() = GamePhase::None,
    }
    if had_snapshot || always_notify {
      self.listeners.publish(None);
    }
  }

  fn note_phase(&self, phase: GamePhase) {
    let mut last = match self.last_phase.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    };
    if *last != phase {
      info!(target: "lcu::phase", "[LCU Phase] Phase changed: {} -> {}", *last, phase);
      *last = phase;
    }
  }
}

/// Phase from the gameflow session, falling back to the bare phase endpoint.
/// The session is returned alongside when it was the source.
async fn current_phase(api: &LcuApi) -> Result<(GamePhase, Option<Value>), LcuError> {
  match api.get_json(GAMEFLOW_SESSION_PATH).await {
    Ok(session) => {
      if let Some(phase) = session.get("phase").and_then(|v| v.as_str()) {
        return Ok((GamePhase::parse(phase), Some(session)));
      }
      debug!(target: "lcu::phase", "[LCU Phase] Gameflow session has no phase field");
    }
    Err(e) => {
      debug!(target: "lcu::phase", "[LCU Phase] Gameflow session unavailable: {}", e);
    }
  }

  let phase = api.get_json(GAMEFLOW_PHASE_PATH).await?;
  phase
    .as_str()
    .map(|raw| (GamePhase::parse(raw), None))
    .ok_or_else(|| LcuError::parse(GAMEFLOW_PHASE_PATH, "expected a phase string"))
}

fn team_records(source: &Value, key: &str) -> Vec<Value> {
  source
    .get(key)
    .and_then(|v| v.as_array())
    .cloned()
    .unwrap_or_default()
}

async fn champ_select_snapshot(
  ctx: &PassContext,
  phase: GamePhase,
  seed: Option<Value>,
) -> Result<RosterSnapshot, LcuError> {
  let session = match seed {
    Some(session) => session,
    None => ctx.api().get_json(CHAMP_SELECT_SESSION_PATH).await?,
  };
  let my_records = team_records(&session, "myTeam");
  let their_records = team_records(&session, "theirTeam");

  let enricher = Enricher::champ_select();
  let (my_team, their_team) = tokio::join!(
    enricher.enrich_team(&my_records, ctx),
    enricher.enrich_team(&their_records, ctx)
  );

  Ok(RosterSnapshot {
    phase,
    their_team,
    my_team,
    raw_source: Some(session),
    captured_at: Utc::now(),
  })
}

async fn in_game_snapshot(ctx: &PassContext, seed: Option<Value>) -> Result<RosterSnapshot, LcuError> {
  let session = match seed {
    Some(session) if session.is_object() => session,
    _ => ctx.api().get_json(GAMEFLOW_SESSION_PATH).await?,
  };
  let game_data = session.get("gameData").cloned().unwrap_or(Value::Null);
  let game_id = game_data
    .get("gameId")
    .and_then(|v| v.as_u64())
    .filter(|id| *id > 0);

  let details = match game_id {
    Some(id) => match ctx.api().get_json(&game_details_path(id)).await {
      Ok(details) => Some(details),
      Err(e) => {
        warn!(
          target: "lcu::phase",
          "[LCU Phase] Game {} details unavailable, using session teams: {}",
          id,
          e
        );
        None
      }
    },
    None => {
      debug!(target: "lcu::phase", "[LCU Phase] Gameflow session carries no game id");
      None
    }
  };

  let participants = details
    .as_ref()
    .and_then(|d| d.get("participants"))
    .and_then(|v| v.as_array())
    .cloned();

  let (my_records, their_records) = match participants {
    Some(list) => {
      let my_team_id = my_team_id(&session, &list, ctx).await;
      list
        .into_iter()
        .partition::<Vec<Value>, _>(|p| p.get("teamId").and_then(|v| v.as_i64()) == Some(my_team_id))
    }
    None => session_teams(&game_data, ctx).await,
  };

  let enricher = Enricher::in_game();
  let (my_team, their_team) = tokio::join!(
    enricher.enrich_team(&my_records, ctx),
    enricher.enrich_team(&their_records, ctx)
  );

  Ok(RosterSnapshot {
    phase: GamePhase::InProgress,
    their_team,
    my_team,
    raw_source: Some(details.unwrap_or(session)),
    captured_at: Utc::now(),
  })
}

async fn local_summoner_id(ctx: &PassContext) -> Option<u64> {
  match ctx.current_summoner().await {
    Ok(me) => me.get("summonerId").and_then(|v| v.as_u64()),
    Err(e) => {
      debug!(target: "lcu::phase", "[LCU Phase] Current summoner unavailable: {}", e);
      None
    }
  }
}

fn contains_summoner(records: &[Value], summoner_id: u64) -> bool {
  records
    .iter()
    .any(|p| p.get("summonerId").and_then(|v| v.as_u64()) == Some(summoner_id))
}

async fn my_team_id(session: &Value, participants: &[Value], ctx: &PassContext) -> i64 {
  if let Some(id) = session
    .get("myTeam")
    .and_then(|t| t.get("teamId"))
    .and_then(|v| v.as_i64())
  {
    return id;
  }
  if let Some(me) = local_summoner_id(ctx).await {
    let mine = participants
      .iter()
      .find(|p| p.get("summonerId").and_then(|v| v.as_u64()) == Some(me))
      .and_then(|p| p.get("teamId"))
      .and_then(|v| v.as_i64());
    if let Some(id) = mine {
      return id;
    }
  }
  DEFAULT_TEAM_ID
}

/// `gameData.teamOne` / `teamTwo`, ordered so the local player's side comes first.
async fn session_teams(game_data: &Value, ctx: &PassContext) -> (Vec<Value>, Vec<Value>) {
  let team_one = team_records(game_data, "teamOne");
  let team_two = team_records(game_data, "teamTwo");
  if team_one.is_empty() && team_two.is_empty() {
    return (team_one, team_two);
  }
  match local_summoner_id(ctx).await {
    Some(me) if contains_summoner(&team_two, me) => (team_two, team_one),
    _ => (team_one, team_two),
  }
}
