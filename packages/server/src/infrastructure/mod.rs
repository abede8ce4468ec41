//! Infrastructure layer: concrete implementations of the domain traits and
//! the wire formats.

pub mod auth;
pub mod channel;
pub mod dto;
pub mod message_pusher;
pub mod repository;
