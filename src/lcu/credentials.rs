// Credential discovery: lockfile lookup and fixed credentials

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::ConnectionCredentials;
use crate::config::MonitorConfig;
use crate::error::LcuError;

const LOCKFILE_NAMES: [&str; 3] = ["lockfile", "LeagueClientUx.lockfile", "LeagueClient.lockfile"];

/// Yields credentials for the running client. Discovery is never retried
/// by the caller; a resolver fails with `LcuError::NotFound`.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
  async fn resolve(&self) -> Result<ConnectionCredentials, LcuError>;
}

/// Reads `name:pid:port:token:protocol` from the first lockfile found in
/// the configured directories.
pub struct LockfileResolver {
  dirs: Vec<PathBuf>,
}

impl LockfileResolver {
  pub fn new(dirs: Vec<PathBuf>) -> Self {
    Self { dirs }
  }

  pub fn from_config(config: &MonitorConfig) -> Self {
    Self::new(config.lockfile_dirs.clone())
  }

  fn read_lockfile_once(&self) -> Option<(PathBuf, ConnectionCredentials)> {
    for dir in &self.dirs {
      for name in LOCKFILE_NAMES {
        let path = dir.join(name);
        if let Some(creds) = read_lockfile(&path) {
          return Some((path, creds));
        }
      }
    }
    None
  }
}

#[async_trait]
impl CredentialResolver for LockfileResolver {
  async fn resolve(&self) -> Result<ConnectionCredentials, LcuError> {
    match self.read_lockfile_once() {
      Some((path, creds)) => {
        info!(
          target: "lcu::credentials",
          "[LCU Credentials] Found lockfile {} (port {}, token {})",
          path.display(),
          creds.port,
          creds.redacted_token()
        );
        Ok(creds)
      }
      None => {
        let searched: Vec<String> = self.dirs.iter().map(|d| d.display().to_string()).collect();
        debug!(target: "lcu::credentials", "[LCU Credentials] No lockfile in {:?}", searched);
        Err(LcuError::NotFound(format!(
          "no valid lockfile found. Is League running? Searched: {}",
          searched.join(", ")
        )))
      }
    }
  }
}

fn read_lockfile(path: &Path) -> Option<ConnectionCredentials> {
  let content = std::fs::read_to_string(path).ok()?;
  parse_lockfile(&content)
}

pub fn parse_lockfile(content: &str) -> Option<ConnectionCredentials> {
  let parts: Vec<&str> = content.trim().split(':').collect();
  if parts.len() < 5 {
    return None;
  }
  let port = parts[2].parse::<u16>().ok()?;
  let token = parts[3];
  if token.is_empty() {
    return None;
  }
  Some(ConnectionCredentials::new(port, token))
}

/// Credentials supplied up front (config override, mock servers, tests).
pub struct FixedResolver {
  port: u16,
  token: String,
  base_url: Option<String>,
}

impl FixedResolver {
  pub fn new(port: u16, token: impl Into<String>) -> Self {
    Self {
      port,
      token: token.into(),
      base_url: None,
    }
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = Some(base_url.into());
    self
  }

  pub fn from_config(config: &MonitorConfig) -> Option<Self> {
    match (config.port, config.token.as_ref()) {
      (Some(port), Some(token)) if !token.is_empty() => Some(Self::new(port, token.clone())),
      _ => None,
    }
  }
}

#[async_trait]
impl CredentialResolver for FixedResolver {
  async fn resolve(&self) -> Result<ConnectionCredentials, LcuError> {
    let creds = ConnectionCredentials::new(self.port, self.token.clone());
    Ok(match &self.base_url {
      Some(url) => creds.with_base_url(url.clone()),
      None => creds,
    })
  }
}
