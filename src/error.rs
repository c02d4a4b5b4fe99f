use thiserror::Error;

// Error handling for the LCU session

/// Coarse failure taxonomy exposed to callers that only need to branch on
/// what went wrong, not on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Discovery,
  Auth,
  Transport,
  Parse,
  PartialEnrichment,
  NotConnected,
  Config,
}

#[derive(Debug, Clone, Error)]
pub enum LcuError {
  /// No running client could be discovered (no lockfile, no credentials).
  #[error("League client not found: {0}")]
  NotFound(String),

  /// The client answered but refused the credential.
  #[error("League client rejected the credential (status {status})")]
  AuthFailed { status: u16 },

  /// Transport-level failure: connection refused or reset, TLS, timeout.
  #[error("League client unreachable: {0}")]
  Unreachable(String),

  /// Non-success answer for a request made after the session was established.
  #[error("{path} returned status {status}")]
  Status { path: String, status: u16 },

  #[error("malformed payload from {source_name}: {message}")]
  Parse { source_name: String, message: String },

  /// A single player's lookup step failed. Never aborts a pass.
  #[error("enrichment stage `{stage}` failed for summoner {summoner_id}: {reason}")]
  Enrichment {
    stage: &'static str,
    summoner_id: u64,
    reason: String,
  },

  #[error("not connected to the League client")]
  NotConnected,

  #[error("configuration error: {0}")]
  Config(String),
}

impl LcuError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(_) => ErrorKind::Discovery,
      Self::AuthFailed { .. } => ErrorKind::Auth,
      Self::Unreachable(_) | Self::Status { .. } => ErrorKind::Transport,
      Self::Parse { .. } => ErrorKind::Parse,
      Self::Enrichment { .. } => ErrorKind::PartialEnrichment,
      Self::NotConnected => ErrorKind::NotConnected,
      Self::Config(_) => ErrorKind::Config,
    }
  }

  pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
    Self::Parse {
      source_name: source_name.into(),
      message: message.to_string(),
    }
  }
}

impl From<reqwest::Error> for LcuError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Unreachable(format!("request timed out: {}", err))
    } else {
      Self::Unreachable(err.to_string())
    }
  }
}

impl From<tokio_tungstenite::tungstenite::Error> for LcuError {
  fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
      WsError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
        Self::AuthFailed {
          status: response.status().as_u16(),
        }
      }
      other => Self::Unreachable(format!("event stream: {}", other)),
    }
  }
}
