// Live session: connection lifecycle, phase handling, snapshot fan-out

pub mod connection;
pub mod listeners;
pub mod phase;
pub mod store;

#[cfg(test)]
pub(crate) mod tests;

pub use connection::LcuSession;
pub use listeners::{ListenerId, ListenerRegistry, SnapshotCallback};
pub use phase::PhaseMachine;
pub use store::{PassTicket, SnapshotStore};
