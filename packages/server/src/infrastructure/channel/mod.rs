//! Line-delimited JSON transport of the coordinator → worker channel.
//!
//! The coordinator writes to each worker's stdin; the worker reads its own
//! stdin. Fire-and-forget: nothing flows back.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::domain::{ChannelError, ChannelMessage};

use super::dto::channel::{decode_line, encode_line};

/// Worker side of the channel.
pub struct ChannelReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> ChannelReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next well-formed instruction, or `None` once the coordinator hung up.
    ///
    /// Malformed lines are logged and skipped.
    pub async fn next_message(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match decode_line(line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => tracing::warn!("Ignoring channel line: {}", e),
            }
        }
        Ok(None)
    }
}

/// Coordinator side of the channel, one per worker.
pub struct ChannelWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ChannelWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn send(&mut self, message: ChannelMessage) -> Result<(), ChannelError> {
        let mut line = encode_line(message)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
