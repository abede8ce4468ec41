//! UseCase layer: one struct per operation of a worker.

pub mod connect_client;
pub mod disconnect_client;
pub mod drain_connections;
pub mod error;
pub mod relay_operator_message;
pub mod send_message;

pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::DisconnectClientUseCase;
pub use drain_connections::DrainConnectionsUseCase;
pub use error::{BroadcastError, ConnectError, SendMessageError};
pub use relay_operator_message::RelayOperatorMessageUseCase;
pub use send_message::{SendMessageUseCase, SendOutcome};
