// Monitor configuration, read from a JSON file (LCU_MONITOR_CONFIG)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LcuError;

pub const CONFIG_ENV_VAR: &str = "LCU_MONITOR_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
  /// Upper bound for any single REST call to the client.
  pub request_timeout_secs: u64,
  pub connect_timeout_secs: u64,
  /// Attempt `n` of the reconnection policy waits `n * reconnect_base_delay_ms`.
  pub reconnect_base_delay_ms: u64,
  pub max_reconnect_attempts: u32,
  /// Directories searched for the client lockfile.
  pub lockfile_dirs: Vec<PathBuf>,
  /// Explicit credential override; skips lockfile discovery when both are set.
  pub port: Option<u16>,
  pub token: Option<String>,
  pub log_filter: String,
  pub log_file: Option<PathBuf>,
}

impl Default for MonitorConfig {
  fn default() -> Self {
    Self {
      request_timeout_secs: 10,
      connect_timeout_secs: 2,
      reconnect_base_delay_ms: 2000,
      max_reconnect_attempts: 3,
      lockfile_dirs: default_lockfile_dirs(),
      port: None,
      token: None,
      log_filter: "info".to_string(),
      log_file: None,
    }
  }
}

fn default_lockfile_dirs() -> Vec<PathBuf> {
  vec![
    PathBuf::from("C:\\Riot Games\\League of Legends"),
    PathBuf::from("C:\\Program Files\\Riot Games\\League of Legends"),
    PathBuf::from("C:\\Program Files (x86)\\Riot Games\\League of Legends"),
    PathBuf::from("/Applications/League of Legends.app/Contents/LoL"),
  ]
}

impl MonitorConfig {
  pub fn load(path: &Path) -> Result<Self, LcuError> {
    let data = std::fs::read_to_string(path)
      .map_err(|e| LcuError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let config: MonitorConfig = serde_json::from_str(&data)
      .map_err(|e| LcuError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
  }

  /// Loads the file named by `LCU_MONITOR_CONFIG`, or defaults when unset.
  pub fn from_env() -> Result<Self, LcuError> {
    match std::env::var(CONFIG_ENV_VAR) {
      Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim())),
      _ => Ok(Self::default()),
    }
  }

  pub fn validate(&self) -> Result<(), LcuError> {
    if self.request_timeout_secs == 0 {
      return Err(LcuError::Config(
        "request_timeout_secs must be greater than zero".into(),
      ));
    }
    if self.connect_timeout_secs == 0 {
      return Err(LcuError::Config(
        "connect_timeout_secs must be greater than zero".into(),
      ));
    }
    if self.max_reconnect_attempts == 0 {
      return Err(LcuError::Config(
        "max_reconnect_attempts must be at least 1".into(),
      ));
    }
    Ok(())
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  pub fn connect_timeout(&self) -> Duration {
    Duration::from_secs(self.connect_timeout_secs)
  }

  pub fn reconnect_delay(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.reconnect_base_delay_ms.saturating_mul(attempt as u64))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_policy() {
    let config = MonitorConfig::default();
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.max_reconnect_attempts, 3);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_reconnect_delay_strictly_increases() {
    let config = MonitorConfig::default();
    let delays: Vec<Duration> = (1..=3).map(|n| config.reconnect_delay(n)).collect();
    assert!(delays.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(delays[2], Duration::from_millis(6000));
  }

  #[test]
  fn test_partial_json_fills_defaults() {
    let config: MonitorConfig =
      serde_json::from_str(r#"{ "max_reconnect_attempts": 5, "port": 2999 }"#).unwrap();
    assert_eq!(config.max_reconnect_attempts, 5);
    assert_eq!(config.port, Some(2999));
    assert_eq!(config.request_timeout_secs, 10);
    assert_eq!(config.log_filter, "info");
  }

  #[test]
  fn test_zero_attempts_rejected() {
    let config = MonitorConfig {
      max_reconnect_attempts: 0,
      ..MonitorConfig::default()
    };
    assert!(matches!(config.validate(), Err(LcuError::Config(_))));
  }

  #[test]
  fn test_load_missing_file_is_config_error() {
    let path = std::env::temp_dir().join(format!("lcu-monitor-missing-{}.json", uuid::Uuid::new_v4()));
    assert!(matches!(MonitorConfig::load(&path), Err(LcuError::Config(_))));
  }
}
