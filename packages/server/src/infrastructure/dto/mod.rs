//! Data Transfer Objects for the two wire protocols.
//!
//! - `websocket`: server ⇄ client frames
//! - `channel`: coordinator → worker instructions

pub mod channel;
pub mod websocket;
