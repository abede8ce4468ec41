//! Worker process supervision.
//!
//! Every worker is this same executable re-run with the `worker` subcommand.
//! The coordinator keeps the write end of each worker's stdin as its channel
//! and respawns any worker that exits while the pool is not shutting down.

use std::{
    ffi::OsString,
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};

use thiserror::Error;
use tokio::{
    process::{Child, ChildStdin, Command},
    sync::mpsc,
};

use crate::{
    config::{CLIENT_TOKEN_ENV, ServerConfig},
    domain::{ChannelMessage, ShutdownSignal},
    infrastructure::channel::ChannelWriter,
};

/// Spawn and pipe faults of the coordinator
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to locate the server executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("failed to spawn worker {slot}: {source}")]
    Spawn {
        slot: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {0} started without a stdin pipe")]
    MissingStdin(usize),

    #[error("worker {0} exited before reporting its pid")]
    MissingPid(usize),
}

/// How to start one worker. The slot index is appended per spawn.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
}

impl WorkerCommand {
    /// Re-run the current executable as a worker with the given configuration.
    pub fn current_exe(config: &ServerConfig) -> Result<Self, SupervisorError> {
        let program = std::env::current_exe().map_err(SupervisorError::CurrentExe)?;
        let mut args = config.to_worker_args();
        args.push("worker".into());
        Ok(Self {
            program,
            args,
            env: vec![(CLIENT_TOKEN_ENV.into(), config.client_token.clone().into())],
        })
    }

    fn command(&self, slot: usize) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--worker-index")
            .arg(slot.to_string())
            .envs(self.env.clone())
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            // Workers finish their drain on their own after the coordinator exits
            .kill_on_drop(false);
        cmd
    }
}

/// Lifecycle of one worker slot as seen by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Draining,
    Terminated,
}

/// A worker process ended
#[derive(Debug)]
pub struct WorkerExit {
    pub slot: usize,
    pub pid: u32,
    /// `None` when waiting on the child failed
    pub status: Option<ExitStatus>,
}

struct WorkerHandle {
    pid: Option<u32>,
    state: WorkerState,
    channel: Option<ChannelWriter<ChildStdin>>,
}

impl WorkerHandle {
    fn terminated() -> Self {
        Self {
            pid: None,
            state: WorkerState::Terminated,
            channel: None,
        }
    }
}

/// Fixed-size pool of worker processes
pub struct WorkerPool {
    command: WorkerCommand,
    workers: Vec<WorkerHandle>,
    exit_tx: mpsc::UnboundedSender<WorkerExit>,
    shutting_down: bool,
}

impl WorkerPool {
    /// Create an empty pool with `size` slots and the stream of worker exits.
    pub fn new(command: WorkerCommand, size: usize) -> (Self, mpsc::UnboundedReceiver<WorkerExit>) {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let workers = (0..size).map(|_| WorkerHandle::terminated()).collect();
        (
            Self {
                command,
                workers,
                exit_tx,
                shutting_down: false,
            },
            exit_rx,
        )
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(|w| w.state).collect()
    }

    pub fn pid(&self, slot: usize) -> Option<u32> {
        self.workers.get(slot).and_then(|w| w.pid)
    }

    /// Start every slot. A slot that fails to spawn stays empty.
    pub fn spawn_all(&mut self) {
        for slot in 0..self.workers.len() {
            if let Err(e) = self.spawn(slot) {
                tracing::error!("{}", e);
            }
        }
    }

    /// Start the worker of one slot and watch it for exit.
    pub fn spawn(&mut self, slot: usize) -> Result<u32, SupervisorError> {
        self.workers[slot].state = WorkerState::Starting;

        let child = match self.command.command(slot).spawn() {
            Ok(child) => child,
            Err(source) => {
                self.workers[slot] = WorkerHandle::terminated();
                return Err(SupervisorError::Spawn { slot, source });
            }
        };
        self.track(slot, child)
    }

    /// Take over a spawned child: keep its stdin as the channel and watch it for exit.
    ///
    /// A child without a pid or stdin cannot be supervised; it is killed and
    /// the slot is left terminated.
    fn track(&mut self, slot: usize, mut child: Child) -> Result<u32, SupervisorError> {
        let (pid, stdin) = match (child.id(), child.stdin.take()) {
            (Some(pid), Some(stdin)) => (pid, stdin),
            (pid, _) => {
                if let Err(e) = child.start_kill() {
                    tracing::debug!("Failed to kill unsupervised worker {}: {}", slot, e);
                }
                self.workers[slot] = WorkerHandle::terminated();
                return Err(match pid {
                    None => SupervisorError::MissingPid(slot),
                    Some(_) => SupervisorError::MissingStdin(slot),
                });
            }
        };

        let exit_tx = self.exit_tx.clone();
        tokio::spawn(async move {
            let status = match child.wait().await {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::error!("Failed to wait on worker {} (pid {}): {}", slot, pid, e);
                    None
                }
            };
            let _ = exit_tx.send(WorkerExit { slot, pid, status });
        });

        self.workers[slot] = WorkerHandle {
            pid: Some(pid),
            state: WorkerState::Running,
            channel: Some(ChannelWriter::new(stdin)),
        };
        tracing::info!("Worker {} started (pid {})", slot, pid);
        Ok(pid)
    }

    /// Record a worker exit and respawn its slot unless the pool is shutting down.
    ///
    /// Returns the pid of the replacement, if one was started.
    pub fn handle_exit(&mut self, exit: WorkerExit) -> Option<u32> {
        let Some(worker) = self.workers.get_mut(exit.slot) else {
            return None;
        };
        // Exit of a process this slot no longer tracks
        if worker.pid != Some(exit.pid) {
            return None;
        }
        *worker = WorkerHandle::terminated();

        if self.shutting_down {
            tracing::info!("Worker {} (pid {}) exited", exit.slot, exit.pid);
            return None;
        }

        match exit.status {
            Some(status) => tracing::warn!(
                "Worker {} (pid {}) died with {}, respawning",
                exit.slot,
                exit.pid,
                status
            ),
            None => tracing::warn!("Worker {} (pid {}) died, respawning", exit.slot, exit.pid),
        }
        match self.spawn(exit.slot) {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        }
    }

    /// Send a message to every live worker. Returns how many received it.
    pub async fn broadcast(&mut self, message: ChannelMessage) -> usize {
        let mut delivered = 0;
        for (slot, worker) in self.workers.iter_mut().enumerate() {
            let Some(channel) = worker.channel.as_mut() else {
                continue;
            };
            match channel.send(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to write to worker {}: {}", slot, e);
                    // The worker is gone; its exit will arrive separately
                    worker.channel = None;
                }
            }
        }
        delivered
    }

    /// Tell every worker to drain. Exits after this are not respawned.
    pub async fn shutdown(&mut self, signal: ShutdownSignal) -> usize {
        self.shutting_down = true;
        for worker in &mut self.workers {
            if worker.state == WorkerState::Running {
                worker.state = WorkerState::Draining;
            }
        }
        self.broadcast(ChannelMessage::Shutdown(signal)).await
    }
}
