//! Hiroba server: a broadcast WebSocket server run as one coordinator
//! process supervising several worker processes on a shared port.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
