// Authenticated REST access to the LCU

use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use super::types::ConnectionCredentials;
use crate::config::MonitorConfig;
use crate::error::LcuError;

#[derive(Debug, Clone)]
pub struct GatewayResponse {
  pub status: u16,
  pub body: String,
}

impl GatewayResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn json(&self, source_name: &str) -> Result<Value, LcuError> {
    serde_json::from_str(&self.body).map_err(|e| LcuError::parse(source_name, e))
  }
}

/// Single seam over the transport. Implementations attach the basic-auth
/// header and enforce a per-call timeout; TLS details live beneath it.
#[async_trait]
pub trait RequestGateway: Send + Sync {
  async fn request(
    &self,
    credentials: &ConnectionCredentials,
    method: Method,
    path: &str,
  ) -> Result<GatewayResponse, LcuError>;
}

pub struct HttpGateway {
  client: reqwest::Client,
}

impl HttpGateway {
  pub fn new(config: &MonitorConfig) -> Result<Self, LcuError> {
    // The client serves a self-signed certificate on 127.0.0.1
    let client = reqwest::Client::builder()
      .danger_accept_invalid_certs(true)
      .timeout(config.request_timeout())
      .connect_timeout(config.connect_timeout())
      .pool_max_idle_per_host(2)
      .build()
      .map_err(|e| LcuError::Config(format!("failed to create HTTP client: {}", e)))?;
    Ok(Self { client })
  }
}

#[async_trait]
impl RequestGateway for HttpGateway {
  async fn request(
    &self,
    credentials: &ConnectionCredentials,
    method: Method,
    path: &str,
  ) -> Result<GatewayResponse, LcuError> {
    let url = format!("{}{}", credentials.base_url, path);
    trace!(target: "lcu::gateway", "{} {}", method, url);

    let response = self
      .client
      .request(method, &url)
      .header("Authorization", credentials.basic_auth_header())
      .header("Accept", "application/json")
      .send()
      .await?;

    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(GatewayResponse { status, body })
  }
}

/// Gateway bound to the credentials of the live session.
#[derive(Clone)]
pub struct LcuApi {
  gateway: Arc<dyn RequestGateway>,
  credentials: Arc<ConnectionCredentials>,
}

impl LcuApi {
  pub fn new(gateway: Arc<dyn RequestGateway>, credentials: Arc<ConnectionCredentials>) -> Self {
    Self {
      gateway,
      credentials,
    }
  }

  pub async fn get(&self, path: &str) -> Result<GatewayResponse, LcuError> {
    self
      .gateway
      .request(&self.credentials, Method::GET, path)
      .await
  }

  /// GET and decode. Non-success statuses become errors.
  pub async fn get_json(&self, path: &str) -> Result<Value, LcuError> {
    let response = self.get(path).await?;
    match response.status {
      401 | 403 => Err(LcuError::AuthFailed {
        status: response.status,
      }),
      _ if !response.is_success() => Err(LcuError::Status {
        path: path.to_string(),
        status: response.status,
      }),
      _ => response.json(path),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_response_json_reports_source_on_failure() {
    let response = GatewayResponse {
      status: 200,
      body: "{not json".into(),
    };
    match response.json("/lol-gameflow/v1/session") {
      Err(LcuError::Parse { source_name, .. }) => {
        assert_eq!(source_name, "/lol-gameflow/v1/session")
      }
      other => panic!("expected parse error, got {:?}", other),
    }
  }

  #[test]
  fn test_http_gateway_builds_on_rustls() {
    assert!(HttpGateway::new(&MonitorConfig::default()).is_ok());
  }

  #[test]
  fn test_success_range() {
    let mk = |status| GatewayResponse {
      status,
      body: String::new(),
    };
    assert!(mk(200).is_success());
    assert!(mk(204).is_success());
    assert!(!mk(404).is_success());
    assert!(!mk(401).is_success());
  }
}
