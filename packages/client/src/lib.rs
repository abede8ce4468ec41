//! Interactive terminal client for the Hiroba broadcast server.

pub mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;
