// LCU event subscription over the WAMP WebSocket

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use native_tls::TlsConnector;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::Connector;
use tracing::{debug, info, warn};

use super::types::{
  ConnectionCredentials, CHAMP_SELECT_SESSION_PATH, CHAT_ME_PATH, CURRENT_SUMMONER_PATH,
  GAMEFLOW_PHASE_PATH, GAMEFLOW_SESSION_PATH, RANKED_STATS_PATH, READY_CHECK_PATH,
};
use crate::error::LcuError;

/// WAMP opcode for SUBSCRIBE.
const WAMP_SUBSCRIBE: u8 = 5;

pub const SUBSCRIBED_TOPICS: [&str; 7] = [
  GAMEFLOW_SESSION_PATH,
  CHAMP_SELECT_SESSION_PATH,
  READY_CHECK_PATH,
  GAMEFLOW_PHASE_PATH,
  CHAT_ME_PATH,
  CURRENT_SUMMONER_PATH,
  RANKED_STATS_PATH,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTopic {
  GameflowSession,
  ChampSelectSession,
  ReadyCheck,
  GameflowPhase,
  ChatMe,
  CurrentSummoner,
  RankedStats,
  Other,
}

impl EventTopic {
  pub fn from_uri(uri: &str) -> Self {
    match uri {
      GAMEFLOW_SESSION_PATH => Self::GameflowSession,
      CHAMP_SELECT_SESSION_PATH => Self::ChampSelectSession,
      READY_CHECK_PATH => Self::ReadyCheck,
      GAMEFLOW_PHASE_PATH => Self::GameflowPhase,
      CHAT_ME_PATH => Self::ChatMe,
      CURRENT_SUMMONER_PATH => Self::CurrentSummoner,
      RANKED_STATS_PATH => Self::RankedStats,
      _ => Self::Other,
    }
  }

  /// Topics that can move the phase state machine.
  pub fn drives_state(&self) -> bool {
    matches!(
      self,
      Self::GameflowSession | Self::ChampSelectSession | Self::GameflowPhase
    )
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LcuEvent {
  pub kind: i64,
  pub topic: EventTopic,
  pub uri: String,
  /// "Create" / "Update" / "Delete" when the client sends the JSON API envelope.
  pub event_type: Option<String>,
  pub payload: Value,
}

impl LcuEvent {
  pub fn is_delete(&self) -> bool {
    self.event_type.as_deref() == Some("Delete")
  }
}

/// Subscription frame for one topic, in the client's event-name form.
pub fn subscribe_frame(topic: &str) -> String {
  let event_name = format!("OnJsonApiEvent{}", topic.replace('/', "_"));
  serde_json::json!([WAMP_SUBSCRIBE, event_name]).to_string()
}

/// Decode a push message shaped `[kind, topic, payload]`. The payload may be
/// the bare data or the JSON API envelope `{uri, eventType, data}`.
pub fn decode_event(text: &str) -> Option<LcuEvent> {
  if text.trim().is_empty() {
    return None;
  }
  let message: Value = serde_json::from_str(text).ok()?;
  let parts = message.as_array()?;
  if parts.len() < 3 {
    return None;
  }

  let kind = parts[0].as_i64().unwrap_or_default();
  let topic_name = parts[1].as_str().unwrap_or_default();
  let payload = &parts[2];

  let enveloped = payload.get("uri").and_then(|v| v.as_str()).is_some() && payload.get("data").is_some();
  let (uri, event_type, data) = if enveloped {
    (
      payload.get("uri").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
      payload.get("eventType").and_then(|v| v.as_str()).map(|s| s.to_string()),
      payload.get("data").cloned().unwrap_or(Value::Null),
    )
  } else {
    (topic_name.to_string(), None, payload.clone())
  };

  Some(LcuEvent {
    kind,
    topic: EventTopic::from_uri(&uri),
    uri,
    event_type,
    payload: data,
  })
}

/// Live event feed. The channel closes when the underlying subscription ends.
pub type EventStream = mpsc::UnboundedReceiver<LcuEvent>;

#[async_trait]
pub trait EventSource: Send + Sync {
  async fn open(&self, credentials: &ConnectionCredentials) -> Result<EventStream, LcuError>;
}

pub struct WebSocketEventSource;

#[async_trait]
impl EventSource for WebSocketEventSource {
  async fn open(&self, credentials: &ConnectionCredentials) -> Result<EventStream, LcuError> {
    let ws_url = websocket_url(&credentials.base_url)?;

    let tls = TlsConnector::builder()
      .danger_accept_invalid_certs(true)
      .build()
      .map_err(|e| LcuError::Unreachable(format!("failed to build TLS connector: {}", e)))?;

    let mut request = ws_url
      .as_str()
      .into_client_request()
      .map_err(|e| LcuError::Unreachable(format!("invalid WebSocket URL {}: {}", ws_url, e)))?;
    let auth = credentials
      .basic_auth_header()
      .parse::<http::HeaderValue>()
      .map_err(|e| LcuError::Unreachable(format!("invalid auth header: {}", e)))?;
    request.headers_mut().insert("Authorization", auth);
    request
      .headers_mut()
      .insert("Sec-WebSocket-Protocol", http::HeaderValue::from_static("wamp"));

    debug!(target: "lcu::events", "[LCU Events] Connecting to {}", ws_url);
    let (socket, _response) = tokio_tungstenite::connect_async_tls_with_config(
      request,
      None,
      false,
      Some(Connector::NativeTls(tls)),
    )
    .await?;

    let (mut write, mut read) = socket.split();
    for topic in SUBSCRIBED_TOPICS {
      write.send(Message::Text(subscribe_frame(topic))).await?;
    }
    info!(
      target: "lcu::events",
      "[LCU Events] Subscribed to {} topics",
      SUBSCRIBED_TOPICS.len()
    );

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
      // Keep the write half alive so the client does not see a half-close
      let _write = write;
      loop {
        tokio::select! {
          _ = tx.closed() => break,
          next = read.next() => match next {
            Some(Ok(Message::Text(text))) => {
              if let Some(event) = decode_event(&text) {
                if tx.send(event).is_err() {
                  break;
                }
              }
            }
            Some(Ok(Message::Close(_))) | None => {
              info!(target: "lcu::events", "[LCU Events] Event stream closed by client");
              break;
            }
            Some(Err(e)) => {
              warn!(target: "lcu::events", "[LCU Events] Event stream error: {}", e);
              break;
            }
            Some(Ok(_)) => {}
          }
        }
      }
    });

    Ok(rx)
  }
}

fn websocket_url(base_url: &str) -> Result<url::Url, LcuError> {
  let mut url = url::Url::parse(base_url)
    .map_err(|e| LcuError::Unreachable(format!("invalid base URL {}: {}", base_url, e)))?;
  let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
  url
    .set_scheme(scheme)
    .map_err(|_| LcuError::Unreachable(format!("cannot derive WebSocket URL from {}", base_url)))?;
  url.set_path("/");
  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_bare_topic_message() {
    let event = decode_event(r#"[8, "/lol-gameflow/v1/gameflow-phase", "ChampSelect"]"#).unwrap();
    assert_eq!(event.kind, 8);
    assert_eq!(event.topic, EventTopic::GameflowPhase);
    assert_eq!(event.payload, Value::String("ChampSelect".into()));
    assert!(event.event_type.is_none());
  }

  #[test]
  fn test_decode_json_api_envelope() {
    let text = r#"[8, "OnJsonApiEvent_lol-champ-select_v1_session",
      {"uri": "/lol-champ-select/v1/session", "eventType": "Update", "data": {"myTeam": []}}]"#;
    let event = decode_event(text).unwrap();
    assert_eq!(event.topic, EventTopic::ChampSelectSession);
    assert_eq!(event.event_type.as_deref(), Some("Update"));
    assert!(event.payload.get("myTeam").is_some());
  }

  #[test]
  fn test_decode_rejects_malformed() {
    assert!(decode_event("").is_none());
    assert!(decode_event("not json").is_none());
    assert!(decode_event(r#"[8, "/x"]"#).is_none());
    assert!(decode_event(r#"{"a": 1}"#).is_none());
  }

  #[test]
  fn test_unused_topics_do_not_drive_state() {
    let event = decode_event(r#"[8, "/lol-chat/v1/me", {"availability": "chat"}]"#).unwrap();
    assert_eq!(event.topic, EventTopic::ChatMe);
    assert!(!event.topic.drives_state());
    assert!(EventTopic::GameflowSession.drives_state());
  }

  #[test]
  fn test_subscribe_frame_uses_event_name() {
    assert_eq!(
      subscribe_frame(GAMEFLOW_SESSION_PATH),
      r#"[5,"OnJsonApiEvent_lol-gameflow_v1_session"]"#
    );
  }

  #[test]
  fn test_websocket_url_from_base() {
    let url = websocket_url("https://127.0.0.1:54321").unwrap();
    assert_eq!(url.as_str(), "wss://127.0.0.1:54321/");
    let url = websocket_url("http://localhost:2999").unwrap();
    assert_eq!(url.as_str(), "ws://localhost:2999/");
  }
}
