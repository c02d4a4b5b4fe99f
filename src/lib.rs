// Live match roster monitor for the League Client (LCU)

pub mod config;
pub mod error;
pub mod lcu;
pub mod logging;
pub mod roster;
pub mod session;

pub use config::MonitorConfig;
pub use error::{ErrorKind, LcuError};
pub use lcu::{ConnectionState, GamePhase};
pub use roster::{PlayerView, RosterSnapshot};
pub use session::{LcuSession, ListenerId};
