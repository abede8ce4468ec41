//! HTTP and WebSocket handlers of a worker.

pub mod http;
pub mod websocket;

pub use http::{HealthDto, health_check};
pub use websocket::websocket_handler;
