// Logging setup: stderr output plus an optional append-only live log file

use std::fs::File;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::MonitorConfig;
use crate::error::LcuError;

/// Install the global subscriber. `RUST_LOG` wins over `config.log_filter`.
pub fn init_tracing(config: &MonitorConfig) -> Result<(), LcuError> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.log_filter))
    .map_err(|e| LcuError::Config(format!("invalid log filter: {}", e)))?;

  let live_log = match &config.log_file {
    Some(path) => {
      if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
          std::fs::create_dir_all(dir).map_err(|e| {
            LcuError::Config(format!("failed to create log dir {}: {}", dir.display(), e))
          })?;
        }
      }
      let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LcuError::Config(format!("failed to open {}: {}", path.display(), e)))?;
      Some(Mutex::new(file))
    }
    None => None,
  };

  let result = match live_log {
    Some(file) => tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_ansi(false)
      .with_writer(std::io::stderr.and(file))
      .try_init(),
    None => tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .try_init(),
  };

  result.map_err(|e| LcuError::Config(format!("failed to install subscriber: {}", e)))
}

/// Token-safe rendering of a credential for log lines.
pub fn redact(secret: &str) -> String {
  let visible: String = secret.chars().take(2).collect();
  format!("{}***({} chars)", visible, secret.chars().count())
}
