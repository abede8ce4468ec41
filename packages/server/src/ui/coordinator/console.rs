//! Operator console of the coordinator.

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// Literal line that starts the shutdown protocol
pub const SHUTDOWN_COMMAND: &str = "shutdown";

/// What the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Shutdown,
    Broadcast(String),
}

/// Raw input from the console thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Line(String),
    /// Ctrl+C at the prompt
    Interrupted,
    /// Ctrl+D or closed stdin
    Closed,
}

/// Interpret one console line. Blank lines are ignored.
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else if line == SHUTDOWN_COMMAND {
        Some(ConsoleCommand::Shutdown)
    } else {
        Some(ConsoleCommand::Broadcast(line.to_string()))
    }
}

/// Start reading the console on a dedicated thread.
///
/// The thread is a plain OS thread so that it never holds up runtime shutdown.
pub fn spawn_console() -> mpsc::UnboundedReceiver<ConsoleEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                let _ = tx.send(ConsoleEvent::Closed);
                return;
            }
        };

        loop {
            let event = match rl.readline("> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim()).ok();
                    }
                    ConsoleEvent::Line(line)
                }
                Err(ReadlineError::Interrupted) => ConsoleEvent::Interrupted,
                Err(ReadlineError::Eof) => ConsoleEvent::Closed,
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    ConsoleEvent::Closed
                }
            };
            let last = matches!(event, ConsoleEvent::Closed | ConsoleEvent::Interrupted);
            if tx.send(event).is_err() || last {
                break;
            }
        }
    });

    rx
}
