//! Coordinator process: supervises the workers and owns the operator console.

pub mod console;
pub mod supervisor;

use std::error::Error;

use tokio::sync::mpsc;

use crate::{
    config::{DEFAULT_SHUTDOWN_REASON, ServerConfig},
    domain::{ChannelMessage, OperatorMessage, ShutdownSignal},
};

use super::signal::shutdown_signal;

pub use console::{ConsoleCommand, ConsoleEvent, parse_line, spawn_console};
pub use supervisor::{SupervisorError, WorkerCommand, WorkerExit, WorkerPool, WorkerState};

/// Number of workers when none is configured
pub fn default_worker_count() -> usize {
    if cfg!(unix) {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        // Sharing one port across processes needs SO_REUSEPORT
        1
    }
}

/// Coordinator run loop
pub struct Coordinator {
    pool: WorkerPool,
    exits: mpsc::UnboundedReceiver<WorkerExit>,
}

impl Coordinator {
    pub fn new(command: WorkerCommand, workers: usize) -> Self {
        let workers = workers.clamp(1, default_worker_count());
        let (pool, exits) = WorkerPool::new(command, workers);
        Self { pool, exits }
    }

    /// Start the workers and supervise them until the operator shuts down.
    ///
    /// Returns right after the shutdown signal has been written to every
    /// worker; it does not wait for the workers to finish draining.
    pub async fn run(
        mut self,
        mut console: mpsc::UnboundedReceiver<ConsoleEvent>,
    ) -> Result<(), Box<dyn Error>> {
        tracing::info!(
            "Coordinator {} starting {} worker(s)",
            std::process::id(),
            self.pool.size()
        );
        self.pool.spawn_all();

        let os_signal = shutdown_signal();
        tokio::pin!(os_signal);
        let mut console_open = true;

        loop {
            tokio::select! {
                Some(exit) = self.exits.recv() => {
                    self.pool.handle_exit(exit);
                }
                event = console.recv(), if console_open => match event {
                    Some(ConsoleEvent::Line(line)) => match parse_line(&line) {
                        Some(ConsoleCommand::Shutdown) => break,
                        Some(ConsoleCommand::Broadcast(text)) => {
                            let count = self
                                .pool
                                .broadcast(ChannelMessage::Operator(OperatorMessage::new(text.clone())))
                                .await;
                            tracing::info!(message = %text, "Sent operator message to {} worker(s)", count);
                        }
                        None => {}
                    },
                    Some(ConsoleEvent::Interrupted) => break,
                    Some(ConsoleEvent::Closed) | None => {
                        tracing::info!("Console closed; supervising until a signal arrives");
                        console_open = false;
                    }
                },
                _ = &mut os_signal => break,
            }
        }

        let count = self
            .pool
            .shutdown(ShutdownSignal::new(DEFAULT_SHUTDOWN_REASON))
            .await;
        tracing::info!("Sent shutdown to {} worker(s)", count);
        Ok(())
    }
}

/// Run the coordinator for the given configuration.
pub async fn run_coordinator(config: &ServerConfig, workers: usize) -> Result<(), Box<dyn Error>> {
    let command = WorkerCommand::current_exe(config)?;
    Coordinator::new(command, workers).run(spawn_console()).await
}
