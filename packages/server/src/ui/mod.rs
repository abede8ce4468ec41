//! UI layer: the worker's HTTP/WebSocket surface and the coordinator process.

pub mod coordinator;
pub mod handler;
pub mod server;
pub mod signal;
pub mod state;
pub mod tracker;

pub use coordinator::{Coordinator, run_coordinator};
pub use server::{WorkerServer, bind_listener, install_panic_hook};
pub use state::AppState;
