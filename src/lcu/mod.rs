// LCU transport seams: credentials, authenticated REST, event subscription

pub mod credentials;
pub mod events;
pub mod gateway;
pub mod types;

pub use credentials::{CredentialResolver, FixedResolver, LockfileResolver};
pub use events::{decode_event, EventSource, EventStream, EventTopic, LcuEvent, WebSocketEventSource};
pub use gateway::{GatewayResponse, HttpGateway, LcuApi, RequestGateway};
pub use types::{ConnectionCredentials, ConnectionState, GamePhase};
