//! Channel-backed sensor source
//!
//! The in-process transport: frames pushed through a [`FrameSender`] come
//! out of the paired [`ChannelSource`]. This is how synchronous submission
//! paths (and tests) inject readings without a real upstream.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use parkhub_core::AdapterError;

use crate::error::GatewayError;

use super::SensorSource;

/// Sender half of a [`ChannelSource`]
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Bytes>,
}

impl FrameSender {
    /// Submit one raw frame to the pipeline
    ///
    /// # Errors
    /// [`GatewayError::ChannelClosed`] if the source runner has stopped.
    pub async fn send(&self, frame: Bytes) -> Result<(), GatewayError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }
}

/// Sensor source reading frames from an in-process channel
pub struct ChannelSource {
    rx: mpsc::Receiver<Bytes>,
}

impl ChannelSource {
    /// New source with a bounded frame queue
    pub fn new(capacity: usize) -> (FrameSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (FrameSender { tx }, Self { rx })
    }
}

#[async_trait]
impl SensorSource for ChannelSource {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn connect(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, AdapterError> {
        Ok(self.rx.recv().await)
    }
}
