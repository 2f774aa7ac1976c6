//! Event source adapter - where raw sensor frames enter the pipeline
//!
//! Two seams keep the upstream pluggable:
//!
//! - [`SensorDecoder`] turns one raw frame into payloads (JSON, base64
//!   event-hub framing, whatever a deployment speaks).
//! - [`SensorSource`] is the transport: connect to upstream, receive
//!   frames, report transport failures.
//!
//! [`SourceRunner`] drives a source against a decoder: it reconnects with
//! backoff when the transport drops, skips undecodable frames with a
//! warning, and feeds everything else to the engine. Losing the upstream
//! never restarts the engine or touches already-applied state.

mod channel;
mod json;

pub use channel::{ChannelSource, FrameSender};
pub use json::{Base64JsonDecoder, JsonDecoder};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use parkhub_core::{AdapterError, SensorPayload};

use crate::config::Backoff;
use crate::engine::IngestionEngine;

/// Decodes one raw frame into sensor payloads
pub trait SensorDecoder: Send + Sync {
    /// Short name for logging ("json", "base64-json", ...)
    fn name(&self) -> &'static str;

    /// Decode a frame; a frame may carry several payloads
    ///
    /// # Errors
    /// [`AdapterError::Decode`] if the frame is unparseable. The runner
    /// drops the frame and keeps reading.
    fn decode(&self, data: &[u8]) -> Result<Vec<SensorPayload>, AdapterError>;
}

/// Abstract upstream transport delivering raw sensor frames
#[async_trait]
pub trait SensorSource: Send {
    /// Short name for logging ("event-hub", "channel", ...)
    fn name(&self) -> &'static str;

    /// (Re-)establish the upstream connection
    ///
    /// Called before the first `recv` and again after any transport error.
    /// Implementations without connection state just return `Ok(())`.
    ///
    /// # Errors
    /// [`AdapterError::Transport`] if upstream is unreachable; the runner
    /// backs off and calls again.
    async fn connect(&mut self) -> Result<(), AdapterError>;

    /// Receive the next raw frame
    ///
    /// `Ok(None)` means the stream ended cleanly and the runner should
    /// stop.
    ///
    /// # Errors
    /// [`AdapterError::Transport`] on a broken stream; the runner
    /// reconnects with backoff.
    async fn recv(&mut self) -> Result<Option<Bytes>, AdapterError>;
}

/// Drives one source against one decoder until cancelled or end-of-stream
pub struct SourceRunner {
    engine: Arc<IngestionEngine>,
    decoder: Box<dyn SensorDecoder>,
    backoff: Backoff,
    cancel: CancellationToken,
}

impl SourceRunner {
    /// New runner feeding `engine`
    pub fn new(
        engine: Arc<IngestionEngine>,
        decoder: impl SensorDecoder + 'static,
        backoff: Backoff,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            decoder: Box::new(decoder),
            backoff,
            cancel,
        }
    }

    /// Run until the source ends cleanly or the token cancels
    pub async fn run<S: SensorSource>(self, mut source: S) {
        let mut attempt: u32 = 0;

        loop {
            // Connect, backing off while upstream is unreachable
            loop {
                if self.cancel.is_cancelled() {
                    info!(source = source.name(), "source runner cancelled");
                    return;
                }
                match source.connect().await {
                    Ok(()) => {
                        if attempt > 0 {
                            info!(source = source.name(), attempt, "source reconnected");
                        } else {
                            info!(source = source.name(), "source connected");
                        }
                        attempt = 0;
                        break;
                    }
                    Err(err) => {
                        let delay = self.backoff.delay(attempt);
                        warn!(
                            source = source.name(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "source connect failed, backing off"
                        );
                        attempt = attempt.saturating_add(1);
                        tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }

            // Read frames until the stream breaks or ends
            loop {
                let frame = tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!(source = source.name(), "source runner cancelled");
                        return;
                    }
                    frame = source.recv() => frame,
                };

                match frame {
                    Ok(Some(data)) => self.handle_frame(&data),
                    Ok(None) => {
                        info!(source = source.name(), "source stream ended");
                        return;
                    }
                    Err(err) => {
                        warn!(source = source.name(), error = %err, "source transport error, reconnecting");
                        break;
                    }
                }
            }
        }
    }

    fn handle_frame(&self, data: &[u8]) {
        match self.decoder.decode(data) {
            Ok(payloads) => {
                debug!(decoder = self.decoder.name(), payloads = payloads.len(), "frame decoded");
                for payload in payloads {
                    self.engine.ingest(payload);
                }
            }
            Err(err) => {
                warn!(
                    decoder = self.decoder.name(),
                    error = %err,
                    bytes = data.len(),
                    "dropping undecodable frame"
                );
            }
        }
    }
}
