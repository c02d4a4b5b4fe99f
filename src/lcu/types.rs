// Types and constants for the LCU connection

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CURRENT_SUMMONER_PATH: &str = "/lol-summoner/v1/current-summoner";
pub const GAMEFLOW_SESSION_PATH: &str = "/lol-gameflow/v1/session";
pub const GAMEFLOW_PHASE_PATH: &str = "/lol-gameflow/v1/gameflow-phase";
pub const CHAMP_SELECT_SESSION_PATH: &str = "/lol-champ-select/v1/session";
pub const READY_CHECK_PATH: &str = "/lol-matchmaking/v1/ready-check";
pub const CHAT_ME_PATH: &str = "/lol-chat/v1/me";
pub const RANKED_STATS_PATH: &str = "/lol-ranked/v1/current-ranked-stats";

pub fn summoner_path(summoner_id: u64) -> String {
  format!("/lol-summoner/v1/summoners/{}", summoner_id)
}

pub fn game_details_path(game_id: u64) -> String {
  format!("/lol-gameflow/v1/games/{}", game_id)
}

/// Connection details for one running client. The token never leaves this
/// struct except through `basic_auth_header`.
pub struct ConnectionCredentials {
  pub port: u16,
  pub base_url: String,
  auth_token: SecretString,
}

impl ConnectionCredentials {
  pub fn new(port: u16, auth_token: impl Into<String>) -> Self {
    Self {
      port,
      base_url: format!("https://127.0.0.1:{}", port),
      auth_token: SecretString::from(auth_token.into()),
    }
  }

  /// Point at a non-default host, e.g. a local mock server.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into().trim_end_matches('/').to_string();
    self
  }

  pub fn has_token(&self) -> bool {
    !self.auth_token.expose_secret().is_empty()
  }

  pub fn basic_auth_header(&self) -> String {
    use base64::{engine::general_purpose, Engine};
    let auth = general_purpose::STANDARD.encode(format!("riot:{}", self.auth_token.expose_secret()));
    format!("Basic {}", auth)
  }

  pub fn redacted_token(&self) -> String {
    crate::logging::redact(self.auth_token.expose_secret())
  }
}

impl fmt::Debug for ConnectionCredentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectionCredentials")
      .field("port", &self.port)
      .field("base_url", &self.base_url)
      .field("auth_token", &"[REDACTED]")
      .finish()
  }
}

/// Observable connection status. Every transition builds a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
  pub is_connected: bool,
  pub base_url: Option<String>,
  pub port: Option<u16>,
  pub has_credential: bool,
  pub last_error: Option<String>,
}

impl ConnectionState {
  pub fn disconnected() -> Self {
    Self::default()
  }

  pub fn failed(error: impl ToString) -> Self {
    Self {
      last_error: Some(error.to_string()),
      ..Self::default()
    }
  }

  pub fn connected(credentials: &ConnectionCredentials) -> Self {
    Self {
      is_connected: true,
      base_url: Some(credentials.base_url.clone()),
      port: Some(credentials.port),
      has_credential: credentials.has_token(),
      last_error: None,
    }
  }

  pub fn with_error(&self, error: impl ToString) -> Self {
    Self {
      last_error: Some(error.to_string()),
      ..self.clone()
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GamePhase {
  #[default]
  None,
  Lobby,
  Matchmaking,
  ReadyCheck,
  ChampSelect,
  GameStart,
  InProgress,
  WaitingForStats,
  PreEndOfGame,
  EndOfGame,
  Unknown,
}

impl GamePhase {
  pub fn parse(raw: &str) -> Self {
    match raw.trim() {
      "None" | "" => Self::None,
      "Lobby" => Self::Lobby,
      "Matchmaking" => Self::Matchmaking,
      "ReadyCheck" => Self::ReadyCheck,
      "ChampSelect" => Self::ChampSelect,
      "GameStart" => Self::GameStart,
      "InProgress" => Self::InProgress,
      "WaitingForStats" => Self::WaitingForStats,
      "PreEndOfGame" => Self::PreEndOfGame,
      "EndOfGame" => Self::EndOfGame,
      _ => Self::Unknown,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::None => "None",
      Self::Lobby => "Lobby",
      Self::Matchmaking => "Matchmaking",
      Self::ReadyCheck => "ReadyCheck",
      Self::ChampSelect => "ChampSelect",
      Self::GameStart => "GameStart",
      Self::InProgress => "InProgress",
      Self::WaitingForStats => "WaitingForStats",
      Self::PreEndOfGame => "PreEndOfGame",
      Self::EndOfGame => "EndOfGame",
      Self::Unknown => "Unknown",
    }
  }
}

impl fmt::Display for GamePhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
