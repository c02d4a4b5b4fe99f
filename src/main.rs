// lcu-monitor entry point
//
// 1. Load config (LCU_MONITOR_CONFIG) and initialize tracing
// 2. Pick a credential resolver: explicit port/token, else the lockfile
// 3. Connect, retrying discovery until a client shows up
// 4. Log every published roster until Ctrl+C

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use lcu_monitor::lcu::{
  CredentialResolver, FixedResolver, HttpGateway, LockfileResolver, WebSocketEventSource,
};
use lcu_monitor::logging::init_tracing;
use lcu_monitor::{ErrorKind, LcuError, LcuSession, MonitorConfig, RosterSnapshot};

const DISCOVERY_RETRY: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), LcuError> {
  let config = MonitorConfig::from_env()?;
  init_tracing(&config)?;
  info!("lcu-monitor starting");

  let resolver: Arc<dyn CredentialResolver> = match FixedResolver::from_config(&config) {
    Some(fixed) => {
      info!("Using configured port {:?}", config.port);
      Arc::new(fixed)
    }
    None => Arc::new(LockfileResolver::from_config(&config)),
  };
  let gateway = Arc::new(HttpGateway::new(&config)?);
  let session = LcuSession::new(config, resolver, gateway, Arc::new(WebSocketEventSource));
  session.subscribe(log_snapshot);

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        info!("Interrupted before a client was found");
        return Ok(());
      }
      result = session.connect() => match result {
        Ok(state) => {
          info!("Connected to League client on port {:?}", state.port);
          break;
        }
        Err(e) if e.kind() == ErrorKind::Config => return Err(e),
        Err(e) => {
          warn!("{}; retrying in {}s", e, DISCOVERY_RETRY.as_secs());
          tokio::time::sleep(DISCOVERY_RETRY).await;
        }
      }
    }
  }

  if let Err(e) = tokio::signal::ctrl_c().await {
    error!("Failed to listen for Ctrl+C: {}", e);
  }
  info!("Shutting down");
  session.disconnect().await;
  Ok(())
}

fn log_snapshot(snapshot: Option<RosterSnapshot>) {
  let Some(snapshot) = snapshot else {
    info!("Roster cleared");
    return;
  };
  info!(
    "Phase {}: {} ally / {} enemy",
    snapshot.phase,
    snapshot.my_team.len(),
    snapshot.their_team.len()
  );
  for (side, team) in [("ally", &snapshot.my_team), ("enemy", &snapshot.their_team)] {
    for player in team {
      info!(
        "  [{}] {} - {} ({} / {}){}",
        side,
        player.display_name,
        player.champion_name,
        player.spell1_name,
        player.spell2_name,
        player
          .assigned_position
          .as_deref()
          .map(|p| format!(" {}", p))
          .unwrap_or_default()
      );
    }
  }
}
