//! Serve loop that pumps frames from a byte stream through the dispatcher.
//!
//! Frames are handled strictly in arrival order: each one is decoded,
//! dispatched and its reply written before the next is read.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{CodecError, FrameReader, FrameWriter};
use crate::dispatch::Dispatcher;

/// Why [`LspServer::serve`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The client closed its end of the stream.
    InputClosed,
    /// The client sent `exit`.
    Exited,
}

pub struct LspServer {
    dispatcher: Dispatcher,
}

impl LspServer {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve until EOF or `exit`.
    ///
    /// Malformed frames are logged and skipped. Transport I/O failures end
    /// the loop with an error.
    pub async fn serve<R, W>(&mut self, input: R, output: W) -> Result<ServeOutcome>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = FrameReader::new(input);
        let mut writer = FrameWriter::new(output);

        loop {
            let frame = match reader.read_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Client closed input");
                    return Ok(ServeOutcome::InputClosed);
                }
                Err(CodecError::Framing(e)) => {
                    tracing::warn!("Skipping malformed frame: {e}");
                    continue;
                }
                Err(e) => return Err(e).context("reading LSP frame"),
            };

            if let Some(reply) = self.dispatcher.handle_frame(&frame) {
                writer
                    .write_frame(&reply)
                    .await
                    .context("writing LSP frame")?;
                tracing::debug!("Sent the response");
            }

            if self.dispatcher.is_exited() {
                return Ok(ServeOutcome::Exited);
            }
        }
    }
}
