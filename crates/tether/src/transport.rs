//! Line-delimited framing over any async byte stream.
//!
//! One frame per line, compact JSON, `\n` terminated. The same
//! [`Transport`] type wraps child-process pipes, the current process's
//! stdio, and in-memory duplex streams.

use crate::error::TransportError;
use crate::protocol::{Message, RequestId};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tracing::trace;

/// A framed, bidirectional message stream.
pub struct Transport {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    read_timeout: Option<Duration>,
    line: Vec<u8>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(BufReader::new(reader)),
            writer: Box::new(writer),
            read_timeout: None,
            line: Vec::new(),
        }
    }

    /// Frames over this process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Bound how long [`receive`](Self::receive) waits for a frame.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Write one frame and flush.
    pub async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        let mut line = serde_json::to_string(message).map_err(TransportError::Encode)?;
        trace!("--> {line}");
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next frame, skipping blank lines.
    pub async fn receive(&mut self) -> Result<Message, TransportError> {
        let deadline = self.read_timeout.map(|limit| Instant::now() + limit);
        self.receive_until(deadline).await
    }

    /// Read the next frame, giving up at `deadline` instead of starting a
    /// fresh read timeout. Lets a caller bound several reads with one limit.
    pub async fn receive_until(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Message, TransportError> {
        let Some(deadline) = deadline else {
            return self.next_frame().await;
        };
        let limit = self.read_timeout.unwrap_or_default();
        tokio::time::timeout_at(deadline, self.next_frame())
            .await
            .map_err(|_| TransportError::Timeout(limit))?
    }

    async fn next_frame(&mut self) -> Result<Message, TransportError> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Err(TransportError::Closed);
            }
            let frame = match std::str::from_utf8(&self.line) {
                Ok(text) => text.trim(),
                Err(e) => {
                    return Err(TransportError::Parse {
                        message: format!("frame is not valid UTF-8: {e}"),
                        id: None,
                    });
                }
            };
            if frame.is_empty() {
                continue;
            }
            trace!("<-- {frame}");
            return decode(frame);
        }
    }
}

/// Decode one line into a frame. On failure, try to salvage the request
/// id so the peer can still be answered.
pub fn decode(line: &str) -> Result<Message, TransportError> {
    serde_json::from_str(line).map_err(|e| TransportError::Parse {
        message: e.to_string(),
        id: recover_id(line),
    })
}

fn recover_id(line: &str) -> Option<RequestId> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let id = value.as_object()?.get("id")?;
    serde_json::from_value(id.clone()).ok()
}
