//! Domain layer: pure types and policies of the fan-out core, plus the
//! traits the use cases depend on.

pub mod admission;
pub mod auth;
pub mod channel;
pub mod connection;
pub mod error;
pub mod handshake_limit;
pub mod pusher;
pub mod repository;
pub mod sanitize;
pub mod value_object;

pub use admission::{
    AcceptedMessage, AdmissionController, AdmissionPolicy, RawMessage, Verdict,
    DEFAULT_FORBIDDEN_WORDS,
};
pub use auth::{Authenticator, Handshake};
pub use channel::{ChannelMessage, OperatorMessage, ShutdownSignal};
pub use connection::ConnectionState;
pub use error::{AuthError, ChannelError, MessagePushError, RegistryError, RejectReason};
pub use handshake_limit::HandshakeLimiter;
pub use pusher::{MessagePusher, OutboundFrame, PusherChannel};
pub use repository::ConnectionRepository;
pub use value_object::{ConnectionId, Identity, Origin, Timestamp};

#[cfg(test)]
pub use auth::MockAuthenticator;
#[cfg(test)]
pub use pusher::MockMessagePusher;
